use axum::extract::FromRef;

use crate::kv::KeyValueBackend;
use crate::notifications::NotificationStore;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedNotificationStore = Arc<NotificationStore>;
pub type GuardedBackend = Arc<dyn KeyValueBackend>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub notification_store: GuardedNotificationStore,
    pub backend: GuardedBackend,
    pub hash: String,
}

impl ServerState {
    pub fn new(
        config: ServerConfig,
        notification_store: GuardedNotificationStore,
        backend: GuardedBackend,
    ) -> Self {
        Self {
            config,
            start_time: Instant::now(),
            notification_store,
            backend,
            hash: env!("GIT_HASH").to_string(),
        }
    }
}

impl FromRef<ServerState> for GuardedNotificationStore {
    fn from_ref(input: &ServerState) -> Self {
        input.notification_store.clone()
    }
}

impl FromRef<ServerState> for GuardedBackend {
    fn from_ref(input: &ServerState) -> Self {
        input.backend.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
