use std::sync::Arc;

use progress_core::model::{ChildId, DashboardSnapshot, UserId};
use progress_core::time::fixed_now;
use storage::cache::cache_key;
use storage::sqlite::SqliteKeyValueStore;
use storage::{CacheEntry, KeyValueStore, LocalCache};

#[tokio::test]
async fn sqlite_store_upserts_and_removes() {
    let store = SqliteKeyValueStore::open("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open");

    assert_eq!(store.get("missing").await.expect("get"), None);

    store.set("k", "one").await.expect("set");
    store.set("k", "two").await.expect("overwrite");
    assert_eq!(store.get("k").await.expect("get").as_deref(), Some("two"));

    store.remove("k").await.expect("remove");
    store.remove("k").await.expect("remove missing");
    assert_eq!(store.get("k").await.expect("get"), None);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let store = SqliteKeyValueStore::open("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("open");
    store.migrate().await.expect("second migrate");

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
        .fetch_one(store.pool())
        .await
        .expect("count");
    assert_eq!(applied, 1);
}

#[tokio::test]
async fn local_cache_persists_through_sqlite() {
    let store = SqliteKeyValueStore::open("sqlite:file:memdb_kv_cache?mode=memory&cache=shared")
        .await
        .expect("open");
    let cache = LocalCache::new(Arc::new(store.clone()));
    let user = UserId::new("parent-1").unwrap();
    let child = ChildId::new("kid-1").unwrap();

    let entry = CacheEntry {
        snapshot: DashboardSnapshot {
            total_points: 125,
            current_streak: 3,
            ..DashboardSnapshot::default()
        },
        last_updated_at: fixed_now(),
    };
    cache.write(&user, &child, &entry).await;

    let raw = store
        .get(&cache_key(&user, &child))
        .await
        .expect("get")
        .expect("entry stored");
    assert!(raw.contains("\"totalPoints\":125"));
    assert_eq!(cache.read(&user, &child).await, Some(entry));

    store
        .set(&cache_key(&user, &child), "garbage")
        .await
        .expect("set");
    assert_eq!(cache.read(&user, &child).await, None);
}
