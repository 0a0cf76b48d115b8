//! Fast store of refresh session markers.
//!
//! A marker under `refresh:userId:{user_id}:{token}` means the refresh token
//! has not been rotated or revoked. Markers expire with the token.

mod memory;
mod redis;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemorySessionCache;
pub use self::redis::RedisSessionCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Key/value store with per-key expiry, as used for session markers.
#[async_trait]
pub trait SessionCache: Send + Sync {
    /// Set a marker that expires after `ttl`.
    async fn mark_valid(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Number of live markers under this key (0 or 1).
    async fn check_valid(&self, key: &str) -> Result<u64, CacheError>;

    async fn invalidate(&self, key: &str) -> Result<(), CacheError>;

    /// All live marker keys belonging to a user.
    async fn list_user_keys(&self, user_id: i64) -> Result<Vec<String>, CacheError>;

    async fn invalidate_many(&self, keys: &[String]) -> Result<(), CacheError>;
}

/// Key prefix shared by all of a user's markers. The trailing `:` keeps
/// user 1's prefix from matching user 12's keys.
pub fn user_prefix(user_id: i64) -> String {
    format!("refresh:userId:{}:", user_id)
}

pub fn session_key(user_id: i64, token: &str) -> String {
    format!("{}{}", user_prefix(user_id), token)
}
