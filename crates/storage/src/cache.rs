use std::sync::Arc;

use chrono::{DateTime, Utc};
use progress_core::model::{ChildId, DashboardSnapshot, UserId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::kv::{InMemoryKeyValueStore, KeyValueStore, StorageError};

/// Bumping this orphans every previously cached snapshot.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Last known-good dashboard and when it was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub snapshot: DashboardSnapshot,
    pub last_updated_at: DateTime<Utc>,
}

#[must_use]
pub fn cache_key(user: &UserId, child: &ChildId) -> String {
    format!("dashboard:v{CACHE_SCHEMA_VERSION}:{user}:{child}")
}

/// Per-(user, child) dashboard cache.
///
/// Every operation is infallible from the caller's point of view: read
/// failures and corrupt entries are misses, write failures are logged.
#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn KeyValueStore>,
}

impl LocalCache {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    pub async fn read(&self, user: &UserId, child: &ChildId) -> Option<CacheEntry> {
        let key = cache_key(user, child);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(%key, "cache miss");
                return None;
            }
            Err(err) => {
                warn!(%key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!(%key, error = %err, "discarding unreadable cache entry");
                None
            }
        }
    }

    pub async fn write(&self, user: &UserId, child: &ChildId, entry: &CacheEntry) {
        let key = cache_key(user, child);
        if let Err(err) = self.try_write(&key, entry).await {
            warn!(%key, error = %err, "cache write failed");
        }
    }

    pub async fn clear(&self, user: &UserId, child: &ChildId) {
        let key = cache_key(user, child);
        if let Err(err) = self.store.remove(&key).await {
            warn!(%key, error = %err, "cache clear failed");
        }
    }

    async fn try_write(&self, key: &str, entry: &CacheEntry) -> Result<(), StorageError> {
        let raw = serde_json::to_string(entry)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.store.set(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use progress_core::time::fixed_now;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Connection("disk unplugged".into()))
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk unplugged".into()))
        }

        async fn remove(&self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Connection("disk unplugged".into()))
        }
    }

    fn ids() -> (UserId, ChildId) {
        (UserId::new("u1").unwrap(), ChildId::new("c1").unwrap())
    }

    fn entry(points: u32) -> CacheEntry {
        CacheEntry {
            snapshot: DashboardSnapshot {
                total_points: points,
                ..DashboardSnapshot::default()
            },
            last_updated_at: fixed_now(),
        }
    }

    #[test]
    fn key_embeds_version_and_identity() {
        let (user, child) = ids();
        assert_eq!(cache_key(&user, &child), "dashboard:v1:u1:c1");
    }

    #[tokio::test]
    async fn write_then_read_returns_entry() {
        let cache = LocalCache::in_memory();
        let (user, child) = ids();
        assert_eq!(cache.read(&user, &child).await, None);

        cache.write(&user, &child, &entry(40)).await;
        assert_eq!(cache.read(&user, &child).await, Some(entry(40)));

        let other = ChildId::new("c2").unwrap();
        assert_eq!(cache.read(&user, &other).await, None);
    }

    #[tokio::test]
    async fn corrupt_entry_is_a_miss() {
        let store = InMemoryKeyValueStore::new();
        let cache = LocalCache::new(Arc::new(store.clone()));
        let (user, child) = ids();
        store.set(&cache_key(&user, &child), "{not json").await.unwrap();

        assert_eq!(cache.read(&user, &child).await, None);
    }

    #[tokio::test]
    async fn store_failures_are_swallowed() {
        let cache = LocalCache::new(Arc::new(BrokenStore));
        let (user, child) = ids();
        cache.write(&user, &child, &entry(1)).await;
        cache.clear(&user, &child).await;
        assert_eq!(cache.read(&user, &child).await, None);
    }

    #[tokio::test]
    async fn clear_removes_entry() {
        let cache = LocalCache::in_memory();
        let (user, child) = ids();
        cache.write(&user, &child, &entry(5)).await;
        cache.clear(&user, &child).await;
        assert_eq!(cache.read(&user, &child).await, None);
    }
}
