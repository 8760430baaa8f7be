//! Notification store: primary records plus owner and topic indexes.
//!
//! Writes go primary first, then indexes. A failed index write after a
//! successful primary write is logged and counted, never surfaced: readers
//! skip index entries whose record is gone, so the inconsistency heals on
//! its own once the TTL runs out.

use super::models::Notification;
use crate::error::StoreError;
use crate::kv::KeyValueBackend;
use crate::metrics;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Limit used when the caller does not ask for one.
pub const DEFAULT_LIST_LIMIT: usize = 10;

/// Listings never return more than this many entries.
pub const MAX_LIST_LIMIT: usize = 100;

/// Seven days.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct StoreSettings {
    /// Expiry applied to the primary record and to both index sets.
    pub ttl: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Index {
    Owner,
    Topic,
}

impl Index {
    fn label(&self) -> &'static str {
        match self {
            Index::Owner => "owner",
            Index::Topic => "topic",
        }
    }

    fn key(&self, value: &str) -> String {
        match self {
            Index::Owner => owner_index_key(value),
            Index::Topic => topic_index_key(value),
        }
    }

    fn value_of<'a>(&self, notification: &'a Notification) -> &'a str {
        match self {
            Index::Owner => &notification.owner,
            Index::Topic => &notification.topic,
        }
    }
}

pub fn record_key(id: &Uuid) -> String {
    format!("notification:{}", id)
}

pub fn owner_index_key(owner: &str) -> String {
    format!("owner_notifications:{}", owner)
}

pub fn topic_index_key(topic: &str) -> String {
    format!("topic_notifications:{}", topic)
}

pub fn clamp_limit(limit: usize) -> usize {
    limit.min(MAX_LIST_LIMIT)
}

/// TTL-bounded notification store.
///
/// Holds nothing but the backend handle, so it can be shared freely across
/// tasks. Operations on the same id are not serialized.
#[derive(Clone)]
pub struct NotificationStore {
    backend: Arc<dyn KeyValueBackend>,
    settings: StoreSettings,
}

impl NotificationStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, settings: StoreSettings) -> Self {
        Self { backend, settings }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Validate, build and persist a new notification.
    pub async fn create(
        &self,
        owner: &str,
        message: &str,
        topic: Option<&str>,
    ) -> Result<Notification, StoreError> {
        observe("create", self.create_record(owner, message, topic)).await
    }

    /// Point lookup. Absent or expired records are `Ok(None)`.
    pub async fn get(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        observe("get", self.load(id)).await
    }

    /// Most recent notifications of `owner`, newest first.
    pub async fn list_by_owner(
        &self,
        owner: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        observe("list_by_owner", self.list_by_index(Index::Owner, owner, limit)).await
    }

    /// Most recent notifications on `topic`, newest first.
    pub async fn list_by_topic(
        &self,
        topic: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        observe("list_by_topic", self.list_by_index(Index::Topic, topic, limit)).await
    }

    /// Delete a notification and its index entries.
    ///
    /// Returns `false` when there was nothing to delete.
    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        observe("delete", self.delete_record(id)).await
    }

    /// Existence probe on the primary record only.
    pub async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        observe("exists", self.backend.exists(&record_key(&id))).await
    }

    pub async fn mark_as_sent(&self, id: Uuid) -> Result<bool, StoreError> {
        observe(
            "mark_as_sent",
            self.transition(id, "mark_as_sent", Notification::mark_as_sent),
        )
        .await
    }

    pub async fn mark_as_delivered(&self, id: Uuid) -> Result<bool, StoreError> {
        observe(
            "mark_as_delivered",
            self.transition(id, "mark_as_delivered", Notification::mark_as_delivered),
        )
        .await
    }

    pub async fn mark_as_failed(&self, id: Uuid) -> Result<bool, StoreError> {
        observe(
            "mark_as_failed",
            self.transition(id, "mark_as_failed", Notification::mark_as_failed),
        )
        .await
    }

    async fn create_record(
        &self,
        owner: &str,
        message: &str,
        topic: Option<&str>,
    ) -> Result<Notification, StoreError> {
        let notification = Notification::new(owner, message, topic)?;

        self.write_record(&notification).await?;
        self.write_indexes(&notification, "create").await;

        info!(
            "Created notification {} for owner {} on topic {}",
            notification.id, notification.owner, notification.topic
        );
        Ok(notification)
    }

    async fn delete_record(&self, id: Uuid) -> Result<bool, StoreError> {
        let Some(notification) = self.load(id).await? else {
            return Ok(false);
        };

        self.backend.delete(&record_key(&id)).await?;

        let member = id.to_string();
        for index in [Index::Owner, Index::Topic] {
            let key = index.key(index.value_of(&notification));
            if let Err(err) = self.backend.set_remove(&key, &member).await {
                warn!(
                    "Deleted notification {} but failed to remove it from {} index {}: {}",
                    id,
                    index.label(),
                    key,
                    err
                );
                metrics::record_index_write_failure(index.label(), "delete");
            }
        }

        info!("Deleted notification {}", id);
        Ok(true)
    }

    async fn load(&self, id: Uuid) -> Result<Option<Notification>, StoreError> {
        match self.backend.get_hash(&record_key(&id)).await? {
            Some(fields) => Notification::from_fields(&fields).map(Some),
            None => Ok(None),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        operation: &'static str,
        apply: fn(&mut Notification),
    ) -> Result<bool, StoreError> {
        let Some(mut notification) = self.load(id).await? else {
            debug!("{}: notification {} not found", operation, id);
            return Ok(false);
        };

        apply(&mut notification);
        self.write_record(&notification).await?;
        // Rewriting the record restarts its TTL; the indexes must live as long.
        self.write_indexes(&notification, operation).await;

        debug!("Notification {} is now {}", id, notification.status);
        Ok(true)
    }

    async fn write_record(&self, notification: &Notification) -> Result<(), StoreError> {
        self.backend
            .put_hash(
                &record_key(&notification.id),
                notification.to_fields(),
                self.settings.ttl,
            )
            .await
    }

    /// Best effort: failures are logged and counted, never returned.
    async fn write_indexes(&self, notification: &Notification, operation: &str) {
        let member = notification.id.to_string();
        for index in [Index::Owner, Index::Topic] {
            let key = index.key(index.value_of(notification));
            if let Err(err) = self.backend.set_add(&key, &member, self.settings.ttl).await {
                warn!(
                    "{}: notification {} stored but {} index {} write failed: {}",
                    operation,
                    notification.id,
                    index.label(),
                    key,
                    err
                );
                metrics::record_index_write_failure(index.label(), operation);
            }
        }
    }

    async fn list_by_index(
        &self,
        index: Index,
        value: &str,
        limit: usize,
    ) -> Result<Vec<Notification>, StoreError> {
        let limit = clamp_limit(limit);
        let key = index.key(value);
        let members = self.backend.set_members(&key).await?;

        let mut resolved = Vec::with_capacity(members.len());
        for member in members {
            let found = match Uuid::parse_str(&member) {
                Ok(id) => self.load(id).await?,
                Err(_) => None,
            };
            match found {
                Some(notification) => resolved.push(notification),
                None => self.prune_stale_entry(index, &key, &member).await,
            }
        }

        resolved.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        resolved.truncate(limit);
        Ok(resolved)
    }

    async fn prune_stale_entry(&self, index: Index, key: &str, member: &str) {
        debug!("Skipping stale {} index entry {} in {}", index.label(), member, key);
        metrics::record_stale_index_entry(index.label());
        if let Err(err) = self.backend.set_remove(key, member).await {
            debug!("Failed to prune stale entry {} from {}: {}", member, key, err);
        }
    }
}

/// Runs a store operation and records its outcome and latency.
async fn observe<T, F>(operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let start = Instant::now();
    let result = fut.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(err) => err.kind(),
    };
    metrics::record_store_operation(operation, outcome, start.elapsed());
    result
}
