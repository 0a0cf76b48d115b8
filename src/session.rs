//! Refresh session bookkeeping across the durable and fast stores.
//!
//! The two stores are written one after the other with no shared
//! transaction. The durable delete is the authority on whether a token was
//! consumed; markers only answer "has this token been revoked".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::cache::{CacheError, SessionCache, session_key};
use crate::db::{RefreshSession, RefreshSessionStore};

/// Deadline applied to each store operation.
pub const STORE_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("durable store: {0}")]
    Durable(#[from] sqlx::Error),
    #[error("fast store: {0}")]
    Fast(#[from] CacheError),
    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn is_unique_violation(&self) -> bool {
        match self {
            StoreError::Durable(sqlx::Error::Database(e)) => e.is_unique_violation(),
            _ => false,
        }
    }
}

/// Run a store operation with a deadline.
pub async fn with_deadline<T, E, F>(deadline: Duration, operation: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<StoreError>,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

#[derive(Clone)]
pub struct SessionStore {
    durable: RefreshSessionStore,
    fast: Arc<dyn SessionCache>,
    deadline: Duration,
}

impl SessionStore {
    pub fn new(durable: RefreshSessionStore, fast: Arc<dyn SessionCache>) -> Self {
        Self {
            durable,
            fast,
            deadline: STORE_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub async fn mark_valid(
        &self,
        user_id: i64,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let key = session_key(user_id, token);
        with_deadline(self.deadline, self.fast.mark_valid(&key, ttl)).await
    }

    pub async fn is_marked_valid(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        let key = session_key(user_id, token);
        let count = with_deadline(self.deadline, self.fast.check_valid(&key)).await?;
        Ok(count > 0)
    }

    pub async fn unmark(&self, user_id: i64, token: &str) -> Result<(), StoreError> {
        let key = session_key(user_id, token);
        with_deadline(self.deadline, self.fast.invalidate(&key)).await
    }

    /// Clear every marker of a user. Returns how many were found.
    pub async fn unmark_all(&self, user_id: i64) -> Result<u64, StoreError> {
        let keys = with_deadline(self.deadline, self.fast.list_user_keys(user_id)).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        with_deadline(self.deadline, self.fast.invalidate_many(&keys)).await?;
        Ok(keys.len() as u64)
    }

    pub async fn persist(
        &self,
        user_id: i64,
        token: &str,
        expires_at: u64,
        created_at: u64,
    ) -> Result<i64, StoreError> {
        with_deadline(
            self.deadline,
            self.durable.create(user_id, token, expires_at, created_at),
        )
        .await
    }

    pub async fn find(&self, token: &str) -> Result<Option<RefreshSession>, StoreError> {
        with_deadline(self.deadline, self.durable.get_by_token(token)).await
    }

    /// Delete the durable row of a token being rotated. `false` means some
    /// other request already consumed it.
    pub async fn consume(&self, token: &str) -> Result<bool, StoreError> {
        with_deadline(self.deadline, self.durable.delete_by_token(token)).await
    }

    pub async fn remove(&self, user_id: i64, token: &str) -> Result<bool, StoreError> {
        with_deadline(self.deadline, self.durable.delete_for_user(user_id, token)).await
    }

    pub async fn remove_all(&self, user_id: i64) -> Result<u64, StoreError> {
        with_deadline(self.deadline, self.durable.delete_all_by_user(user_id)).await
    }
}
