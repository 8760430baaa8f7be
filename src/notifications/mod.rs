//! Push notification records and their TTL-bounded store.

mod models;
mod store;

pub use models::{Notification, NotificationStatus};
pub use store::{
    clamp_limit, owner_index_key, record_key, topic_index_key, NotificationStore, StoreSettings,
    DEFAULT_LIST_LIMIT, DEFAULT_TTL, MAX_LIST_LIMIT,
};
