//! Push Store Library
//!
//! Notification persistence over a key-value backend, plus the HTTP surface
//! that exposes it. Modules are public for the integration tests.

pub mod config;
pub mod connection;
pub mod error;
pub mod kv;
pub mod metrics;
pub mod notifications;
pub mod server;

// Re-export commonly used types for convenience
pub use connection::RedisConnection;
pub use error::StoreError;
pub use kv::{KeyValueBackend, MemoryBackend, RedisBackend};
pub use notifications::{Notification, NotificationStatus, NotificationStore, StoreSettings};
pub use server::{make_app, run_server, RequestsLoggingLevel, ServerConfig};
