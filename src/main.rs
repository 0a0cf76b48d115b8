use clap::Parser;
use fintrack::cli::{
    Args, build_config, connect_session_cache, init_logging, load_jwt_secret, open_database,
};
use fintrack::password::CredentialVerifier;
use fintrack::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(jwt_secret) = load_jwt_secret(args.jwt_secret_file.as_deref()) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let Some(cache) = connect_session_cache(args.redis_url.as_deref()).await else {
        std::process::exit(1);
    };

    let verifier = CredentialVerifier::new().unwrap_or_else(|e| {
        error!(error = %e, "Failed to initialize password hashing");
        std::process::exit(1);
    });

    init_cleanup(&db).await;

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    let config = build_config(&args, db, cache, jwt_secret, verifier);
    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }

    info!("Server stopped");
}
