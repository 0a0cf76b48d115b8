use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::{CacheError, SessionCache, user_prefix};

/// In-process marker store. Used when no Redis URL is configured, and in tests.
#[derive(Clone, Default)]
pub struct MemorySessionCache {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of markers held, expired ones included until the next write.
    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl SessionCache for MemorySessionCache {
    async fn mark_valid(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // Expired markers are dropped whenever a new one is written
        entries.retain(|_, deadline| *deadline > now);
        entries.insert(key.to_string(), now + ttl);
        Ok(())
    }

    async fn check_valid(&self, key: &str) -> Result<u64, CacheError> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(match entries.get(key) {
            Some(deadline) if *deadline > now => 1,
            _ => 0,
        })
    }

    async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn list_user_keys(&self, user_id: i64) -> Result<Vec<String>, CacheError> {
        let prefix = user_prefix(user_id);
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, deadline)| key.starts_with(&prefix) && **deadline > now)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn invalidate_many(&self, keys: &[String]) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::session_key;

    #[tokio::test]
    async fn test_mark_check_invalidate() {
        let cache = MemorySessionCache::new();
        let key = session_key(1, "token");

        assert_eq!(cache.check_valid(&key).await.unwrap(), 0);
        cache
            .mark_valid(&key, Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.check_valid(&key).await.unwrap(), 1);

        cache.invalidate(&key).await.unwrap();
        assert_eq!(cache.check_valid(&key).await.unwrap(), 0);

        // Invalidating twice is fine
        cache.invalidate(&key).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_marker_expires() {
        let cache = MemorySessionCache::new();
        let key = session_key(1, "token");
        cache.mark_valid(&key, Duration::from_secs(5)).await.unwrap();

        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(cache.check_valid(&key).await.unwrap(), 0);
        assert!(cache.list_user_keys(1).await.unwrap().is_empty());

        cache
            .mark_valid(&session_key(2, "other"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_and_invalidate_user_keys() {
        let cache = MemorySessionCache::new();
        let ttl = Duration::from_secs(60);
        cache.mark_valid(&session_key(1, "a"), ttl).await.unwrap();
        cache.mark_valid(&session_key(1, "b"), ttl).await.unwrap();
        cache.mark_valid(&session_key(12, "c"), ttl).await.unwrap();

        let mut keys = cache.list_user_keys(1).await.unwrap();
        keys.sort();
        assert_eq!(keys, vec![session_key(1, "a"), session_key(1, "b")]);

        cache.invalidate_many(&keys).await.unwrap();
        assert!(cache.list_user_keys(1).await.unwrap().is_empty());
        assert_eq!(cache.check_valid(&session_key(12, "c")).await.unwrap(), 1);
    }
}
