//! Key-value backend abstraction.
//!
//! The notification store only needs a small set of primitives: hashes with
//! a TTL for primary records and sets with a TTL for the secondary indexes.
//! Anything that provides them can back the store.

mod memory;
mod redis_backend;

pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;

use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Capability contract for a TTL-aware key-value store.
///
/// Expired keys behave exactly like absent keys.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    /// Read every field of the hash at `key`. `None` when absent or expired.
    async fn get_hash(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError>;

    /// Replace the hash at `key` with `fields` and set its expiry to `ttl`.
    async fn put_hash(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Remove `key`. Returns true if something was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Add `member` to the set at `key` and refresh the set expiry to `ttl`.
    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Members of the set at `key`, in no particular order. Empty when absent.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Liveness probe. Never fails, reports false instead.
    async fn is_healthy(&self) -> bool;
}
