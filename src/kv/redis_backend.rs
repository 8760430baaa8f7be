//! Redis implementation of [`KeyValueBackend`].

use super::KeyValueBackend;
use crate::connection::RedisConnection;
use crate::error::StoreError;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Backend that issues commands over a shared [`RedisConnection`].
pub struct RedisBackend {
    connection: Arc<RedisConnection>,
}

impl RedisBackend {
    pub fn new(connection: Arc<RedisConnection>) -> Self {
        Self { connection }
    }

    pub fn connection(&self) -> &Arc<RedisConnection> {
        &self.connection
    }
}

/// Redis expiries have one second resolution; never round a TTL down to zero.
/// A non-positive `EXPIRE` deletes the key, so oversized values saturate.
fn ttl_secs(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1)
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn get_hash(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let mut conn = self.connection.handle().await?;
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        // HGETALL answers an empty map for missing keys
        if fields.is_empty() {
            Ok(None)
        } else {
            Ok(Some(fields))
        }
    }

    async fn put_hash(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.handle().await?;
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .hset_multiple(key, fields.as_slice())
            .ignore()
            .expire(key, ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.handle().await?;
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.connection.handle().await?;
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.handle().await?;
        let _: () = redis::pipe()
            .atomic()
            .sadd(key, member)
            .ignore()
            .expire(key, ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.handle().await?;
        let _: i64 = conn.srem(key, member).await?;
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.connection.handle().await?;
        let members: Vec<String> = conn.smembers(key).await?;
        Ok(members)
    }

    async fn is_healthy(&self) -> bool {
        self.connection.is_healthy().await
    }
}
