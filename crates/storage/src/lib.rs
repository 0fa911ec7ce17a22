#![forbid(unsafe_code)]

pub mod cache;
pub mod kv;
pub mod sqlite;

pub use cache::{CACHE_SCHEMA_VERSION, CacheEntry, LocalCache};
pub use kv::{InMemoryKeyValueStore, KeyValueStore, StorageError};
