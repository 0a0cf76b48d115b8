//! JWT token generation and validation.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::warn;

use crate::duration::parse_duration;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, never looked up in a store
    Access,
    /// Longer-lived refresh token - tracked in both session stores
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user email)
    pub sub: String,
    /// Database user ID
    pub user_id: i64,
    /// User email
    pub email: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID, keeps two tokens minted in the same second distinct
    pub jti: String,
    /// Subject (user email)
    pub sub: String,
    /// Database user ID
    pub user_id: i64,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token lifetime used when the configured value is absent or malformed.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime used when the configured value is absent or malformed.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Lifetimes of the two token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: DEFAULT_ACCESS_TTL,
            refresh: DEFAULT_REFRESH_TTL,
        }
    }
}

impl TokenLifetimes {
    /// Build lifetimes from configured duration strings.
    /// Absent, malformed or sub-second values fall back to the defaults with a warning.
    pub fn from_config(access: Option<&str>, refresh: Option<&str>) -> Self {
        Self {
            access: resolve_ttl("access_ttl", access, DEFAULT_ACCESS_TTL),
            refresh: resolve_ttl("refresh_ttl", refresh, DEFAULT_REFRESH_TTL),
        }
    }
}

/// Token expiry is stored in whole seconds.
const MIN_TTL: Duration = Duration::from_secs(1);

fn resolve_ttl(name: &str, value: Option<&str>, default: Duration) -> Duration {
    let Some(value) = value else {
        warn!(setting = name, default = ?default, "TTL not configured, using default");
        return default;
    };

    match parse_duration(value) {
        Ok(ttl) if ttl >= MIN_TTL => ttl,
        Ok(_) => {
            warn!(setting = name, value, default = ?default, "TTL must be at least one second, using default");
            default
        }
        Err(e) => {
            warn!(setting = name, value, error = %e, default = ?default, "Invalid TTL, using default");
            default
        }
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetimes: TokenLifetimes,
}

/// Result of generating a refresh token.
#[derive(Debug, Clone)]
pub struct RefreshTokenResult {
    /// The JWT token string
    pub token: String,
    /// JWT ID
    pub jti: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and token lifetimes.
    pub fn new(secret: &[u8], lifetimes: TokenLifetimes) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetimes,
        }
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    /// Generate an access token for a user, issued at `now`.
    pub fn issue_access_token(
        &self,
        user_id: i64,
        email: &str,
        now: u64,
    ) -> Result<String, JwtError> {
        let claims = AccessClaims {
            sub: email.to_string(),
            user_id,
            email: email.to_string(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.lifetimes.access.as_secs(),
        };

        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)
    }

    /// Generate a refresh token for a user, issued at `now`.
    pub fn issue_refresh_token(
        &self,
        user_id: i64,
        email: &str,
        now: u64,
    ) -> Result<RefreshTokenResult, JwtError> {
        let jti = uuid::Uuid::new_v4().to_string();
        let exp = now + self.lifetimes.refresh.as_secs();

        let claims = RefreshClaims {
            jti: jti.clone(),
            sub: email.to_string(),
            user_id,
            token_type: TokenType::Refresh,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(RefreshTokenResult {
            token,
            jti,
            expires_at: exp,
        })
    }

    /// Validate and decode an access token.
    pub fn validate_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding_key, &Self::validation())
                .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.decoding_key, &Self::validation())
                .map_err(JwtError::Decoding)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Only the HMAC family is accepted; anything else in the header is rejected.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);
        validation
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("failed to encode token: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
    #[error("failed to decode token: {0}")]
    Decoding(#[source] jsonwebtoken::errors::Error),
    #[error("wrong token type")]
    WrongTokenType,
}
