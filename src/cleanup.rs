//! Startup sweep of expired refresh sessions.
//!
//! Expiry is otherwise enforced when a token is next used, so this only keeps
//! the table from growing across restarts.

use crate::db::Database;
use crate::jwt::unix_now;
use tracing::{error, info};

/// Delete durable refresh sessions whose expiry has passed.
pub async fn run_cleanup(db: &Database) {
    match db.sessions().delete_expired(unix_now()).await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh sessions", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh sessions: {}", e),
    }
}
