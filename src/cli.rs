//! CLI argument parsing, validation, and startup helpers.

use std::sync::Arc;

use crate::ServerConfig;
use crate::cache::{MemorySessionCache, RedisSessionCache, SessionCache};
use crate::db::Database;
use crate::jwt::TokenLifetimes;
use crate::password::CredentialVerifier;
use crate::rate_limit::DEFAULT_CREDENTIAL_ATTEMPTS_PER_MINUTE;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Environment variable holding the token signing key.
pub const JWT_SECRET_ENV: &str = "JWT_SIGNING_KEY";

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "fintrack",
    about = "Personal finance tracker API with JWT sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "fintrack.db")]
    pub database: String,

    /// Redis URL for session markers. Without it markers are kept in memory
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Access token lifetime, e.g. "15m"
    #[arg(long, env = "JWT_ACCESS_TTL")]
    pub access_ttl: Option<String>,

    /// Refresh token lifetime, e.g. "24h"
    #[arg(long, env = "JWT_REFRESH_TTL")]
    pub refresh_ttl: Option<String>,

    /// Login and register attempts allowed per client IP per minute
    #[arg(long, default_value_t = DEFAULT_CREDENTIAL_ATTEMPTS_PER_MINUTE)]
    pub login_rate_per_minute: u32,

    /// Path to file containing the signing key. Prefer the JWT_SIGNING_KEY env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
/// `RUST_LOG` overrides the default `fintrack=info` filter.
pub fn init_logging(format: &LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fintrack=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Load the signing key from the environment or a file.
/// Returns None and logs an error if the key cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(JWT_SECRET_ENV) };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read signing key file");
                return None;
            }
        }
    } else {
        error!(
            "Signing key is required. Set {} (recommended) or use --jwt-secret-file",
            JWT_SECRET_ENV
        );
        return None;
    };

    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "Signing key is shorter than {} characters. Use a longer key",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }

    Some(secret)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Connect to Redis if a URL is given, otherwise fall back to the in-memory store.
/// Returns None and logs an error if Redis is configured but unreachable.
pub async fn connect_session_cache(redis_url: Option<&str>) -> Option<Arc<dyn SessionCache>> {
    let Some(url) = redis_url else {
        warn!("No Redis URL configured, session markers are kept in memory and lost on restart");
        return Some(Arc::new(MemorySessionCache::new()));
    };

    let cache = match RedisSessionCache::connect(url).await {
        Ok(cache) => cache,
        Err(e) => {
            error!(error = %e, "Failed to connect to Redis");
            return None;
        }
    };

    if let Err(e) = cache.ping().await {
        error!(error = %e, "Redis did not answer PING");
        return None;
    }

    info!("Connected to Redis");
    Some(Arc::new(cache))
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    cache: Arc<dyn SessionCache>,
    jwt_secret: String,
    verifier: CredentialVerifier,
) -> ServerConfig {
    ServerConfig {
        db,
        cache,
        jwt_secret: jwt_secret.into_bytes(),
        lifetimes: TokenLifetimes::from_config(
            args.access_ttl.as_deref(),
            args.refresh_ttl.as_deref(),
        ),
        verifier,
        login_rate_per_minute: args.login_rate_per_minute,
    }
}
