//! In-process backend with lazy expiry.
//!
//! Keys are evicted when they are touched after their deadline, the same
//! way Redis handles passive expiry. There is no background sweep.

use super::KeyValueBackend;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Value {
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Deadline for a key written now. A TTL past the clock's range never expires.
fn deadline_after(ttl: Duration) -> Option<Instant> {
    Instant::now().checked_add(ttl)
}

type Entries = HashMap<String, Entry>;

/// Drops `key` if its deadline has passed. Only the touched key is checked.
fn evict_if_expired(entries: &mut Entries, key: &str) {
    if entries
        .get(key)
        .is_some_and(|entry| entry.is_expired(Instant::now()))
    {
        entries.remove(key);
    }
}

/// Memory-backed [`KeyValueBackend`], used by tests and the `memory` backend mode.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<Entries>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop `key` as if its TTL had elapsed. Returns true if the key was live.
    pub fn expire_now(&self, key: &str) -> bool {
        let Ok(mut entries) = self.lock() else {
            return false;
        };
        evict_if_expired(&mut entries, key);
        entries.remove(key).is_some()
    }

    /// Number of live keys. Sweeps every expired entry.
    pub fn key_count(&self) -> usize {
        let Ok(mut entries) = self.lock() else {
            return 0;
        };
        let now = Instant::now();
        entries.retain(|_, entry| !entry.is_expired(now));
        entries.len()
    }

    /// Remaining time to live of `key`, `None` when absent or persistent.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let entries = self.lock_key(key).ok()?;
        let deadline = entries.get(key)?.expires_at?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Entries>, StoreError> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Persistence("memory backend lock poisoned".to_string()))
    }

    /// Locks the map with `key` already evicted if it has expired.
    fn lock_key(&self, key: &str) -> Result<MutexGuard<'_, Entries>, StoreError> {
        let mut entries = self.lock()?;
        evict_if_expired(&mut entries, key);
        Ok(entries)
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::Persistence(format!(
        "WRONGTYPE operation against key {} holding the wrong kind of value",
        key
    ))
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn get_hash(&self, key: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let entries = self.lock_key(key)?;
        match entries.get(key) {
            None => Ok(None),
            Some(Entry {
                value: Value::Hash(fields),
                ..
            }) => Ok(Some(fields.clone())),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn put_hash(
        &self,
        key: &str,
        fields: Vec<(String, String)>,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Hash(fields.into_iter().collect()),
                expires_at: deadline_after(ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.lock_key(key)?;
        Ok(entries.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let entries = self.lock_key(key)?;
        Ok(entries.contains_key(key))
    }

    async fn set_add(&self, key: &str, member: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.lock_key(key)?;
        let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Set(HashSet::new()),
            expires_at: None,
        });
        match &mut entry.value {
            Value::Set(members) => {
                members.insert(member.to_string());
            }
            Value::Hash(_) => return Err(wrong_type(key)),
        }
        entry.expires_at = deadline_after(ttl);
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut entries = self.lock_key(key)?;
        let now_empty = match entries.get_mut(key) {
            None => return Ok(()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => {
                members.remove(member);
                members.is_empty()
            }
            Some(_) => return Err(wrong_type(key)),
        };
        // Redis drops a set once its last member is gone.
        if now_empty {
            entries.remove(key);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.lock_key(key)?;
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Entry {
                value: Value::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn is_healthy(&self) -> bool {
        self.entries.lock().is_ok()
    }
}
