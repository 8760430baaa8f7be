//! Notification data models

use crate::error::StoreError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Delivery status of a notification.
///
/// `Failed` is terminal and the only inactive state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Created,
    Sent,
    Delivered,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Created => "created",
            NotificationStatus::Sent => "sent",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "created" => Some(NotificationStatus::Created),
            "sent" => Some(NotificationStatus::Sent),
            "delivered" => Some(NotificationStatus::Delivered),
            "failed" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, NotificationStatus::Failed)
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A push notification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub owner: String,
    pub message: String,
    pub topic: String,
    pub created_at: DateTime<Utc>,
    pub last_event_at: DateTime<Utc>,
    pub status: NotificationStatus,
}

// Field names of the persisted hash
const FIELD_ID: &str = "id";
const FIELD_OWNER: &str = "owner";
const FIELD_MESSAGE: &str = "message";
const FIELD_TOPIC: &str = "topic";
const FIELD_CREATED_AT: &str = "created_at";
const FIELD_LAST_EVENT_AT: &str = "last_event_at";
const FIELD_STATUS: &str = "status";

impl Notification {
    /// Build a fresh notification in the `created` state.
    ///
    /// `owner` and `message` must contain something other than whitespace.
    /// A missing `topic` falls back to [`Notification::default_topic`].
    pub fn new(owner: &str, message: &str, topic: Option<&str>) -> Result<Self, StoreError> {
        if owner.trim().is_empty() {
            return Err(StoreError::Validation("owner cannot be empty".to_string()));
        }
        if message.trim().is_empty() {
            return Err(StoreError::Validation("message cannot be empty".to_string()));
        }
        let topic = match topic {
            Some(topic) if topic.trim().is_empty() => {
                return Err(StoreError::Validation("topic cannot be empty".to_string()));
            }
            Some(topic) => topic.to_string(),
            None => Self::default_topic(owner),
        };

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner: owner.to_string(),
            message: message.to_string(),
            topic,
            created_at: now,
            last_event_at: now,
            status: NotificationStatus::Created,
        })
    }

    pub fn default_topic(owner: &str) -> String {
        format!("owner_{}_default", owner)
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    pub fn mark_as_sent(&mut self) {
        self.set_status(NotificationStatus::Sent);
    }

    pub fn mark_as_delivered(&mut self) {
        self.set_status(NotificationStatus::Delivered);
    }

    pub fn mark_as_failed(&mut self) {
        self.set_status(NotificationStatus::Failed);
    }

    // No legality check: callers own the transition order.
    fn set_status(&mut self, status: NotificationStatus) {
        self.status = status;
        self.last_event_at = Utc::now();
    }

    /// Flat field map written to the backend.
    pub(crate) fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            (FIELD_ID.to_string(), self.id.to_string()),
            (FIELD_OWNER.to_string(), self.owner.clone()),
            (FIELD_MESSAGE.to_string(), self.message.clone()),
            (FIELD_TOPIC.to_string(), self.topic.clone()),
            (FIELD_CREATED_AT.to_string(), format_timestamp(&self.created_at)),
            (
                FIELD_LAST_EVENT_AT.to_string(),
                format_timestamp(&self.last_event_at),
            ),
            (FIELD_STATUS.to_string(), self.status.as_str().to_string()),
        ]
    }

    /// Rebuild a notification from its stored field map.
    pub(crate) fn from_fields(fields: &HashMap<String, String>) -> Result<Self, StoreError> {
        let field = |name: &str| -> Result<&String, StoreError> {
            fields
                .get(name)
                .ok_or_else(|| StoreError::Persistence(format!("stored record is missing field {}", name)))
        };

        let id = Uuid::parse_str(field(FIELD_ID)?)
            .map_err(|e| StoreError::Persistence(format!("stored record has invalid id: {}", e)))?;
        let status_str = field(FIELD_STATUS)?;
        let status = NotificationStatus::from_str(status_str).ok_or_else(|| {
            StoreError::Persistence(format!("stored record has unknown status {}", status_str))
        })?;

        Ok(Self {
            id,
            owner: field(FIELD_OWNER)?.clone(),
            message: field(FIELD_MESSAGE)?.clone(),
            topic: field(FIELD_TOPIC)?.clone(),
            created_at: parse_timestamp(field(FIELD_CREATED_AT)?)?,
            last_event_at: parse_timestamp(field(FIELD_LAST_EVENT_AT)?)?,
            status,
        })
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Persistence(format!("stored record has invalid timestamp {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sets_defaults() {
        let notification = Notification::new("u1", "hello", None).unwrap();

        assert_eq!(notification.owner, "u1");
        assert_eq!(notification.message, "hello");
        assert_eq!(notification.topic, "owner_u1_default");
        assert_eq!(notification.status, NotificationStatus::Created);
        assert_eq!(notification.created_at, notification.last_event_at);
        assert!(notification.is_active());
    }

    #[test]
    fn test_new_keeps_explicit_topic() {
        let notification = Notification::new("u1", "hello", Some("news")).unwrap();
        assert_eq!(notification.topic, "news");
    }

    #[test]
    fn test_new_generates_distinct_ids() {
        let a = Notification::new("u1", "hello", None).unwrap();
        let b = Notification::new("u1", "hello", None).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_new_rejects_blank_fields() {
        assert!(matches!(
            Notification::new("", "msg", None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            Notification::new("u", "", None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            Notification::new("   ", "msg", None),
            Err(StoreError::Validation(_))
        ));
        assert!(matches!(
            Notification::new("u", "msg", Some(" ")),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_status_transitions_update_last_event_at() {
        let mut notification = Notification::new("u1", "hello", None).unwrap();
        let created_at = notification.created_at;

        notification.mark_as_sent();
        assert_eq!(notification.status, NotificationStatus::Sent);
        assert!(notification.last_event_at >= created_at);

        notification.mark_as_delivered();
        assert_eq!(notification.status, NotificationStatus::Delivered);
        assert!(notification.is_active());

        notification.mark_as_failed();
        assert_eq!(notification.status, NotificationStatus::Failed);
        assert!(!notification.is_active());
        assert_eq!(notification.created_at, created_at);
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            NotificationStatus::Created,
            NotificationStatus::Sent,
            NotificationStatus::Delivered,
            NotificationStatus::Failed,
        ] {
            assert_eq!(NotificationStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(NotificationStatus::from_str("queued"), None);
    }

    #[test]
    fn test_status_serialization() {
        let serialized = serde_json::to_string(&NotificationStatus::Delivered).unwrap();
        assert_eq!(serialized, "\"delivered\"");
    }

    #[test]
    fn test_fields_roundtrip_preserves_everything() {
        let mut notification = Notification::new("u1", "hello", Some("alerts")).unwrap();
        notification.mark_as_sent();

        let fields: HashMap<String, String> = notification.to_fields().into_iter().collect();
        assert_eq!(fields["status"], "sent");
        assert_eq!(fields["topic"], "alerts");

        let restored = Notification::from_fields(&fields).unwrap();
        assert_eq!(restored, notification);
    }

    #[test]
    fn test_from_fields_rejects_corrupt_records() {
        let notification = Notification::new("u1", "hello", None).unwrap();
        let mut fields: HashMap<String, String> = notification.to_fields().into_iter().collect();

        fields.insert("status".to_string(), "bogus".to_string());
        assert!(matches!(
            Notification::from_fields(&fields),
            Err(StoreError::Persistence(_))
        ));

        fields.remove("status");
        assert!(matches!(
            Notification::from_fields(&fields),
            Err(StoreError::Persistence(_))
        ));
    }

    #[test]
    fn test_notification_json_shape() {
        let notification = Notification::new("u1", "hello", None).unwrap();
        let json = serde_json::to_value(&notification).unwrap();

        assert_eq!(json["owner"], "u1");
        assert_eq!(json["status"], "created");
        assert_eq!(json["id"], notification.id.to_string());
        assert!(json["created_at"].is_string());
        assert!(json["last_event_at"].is_string());
    }
}
