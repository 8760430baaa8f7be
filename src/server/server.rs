use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{log_requests, state::*, ServerConfig};
use crate::error::StoreError;
use crate::metrics::metrics_handler;
use crate::notifications::{NotificationStore, DEFAULT_LIST_LIMIT};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
struct ServerStats {
    pub name: &'static str,
    pub version: &'static str,
    pub uptime: String,
    pub hash: String,
}

#[derive(Serialize)]
struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub backend_connected: bool,
    pub version: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    pub error: String,
}

#[derive(Deserialize, Debug)]
struct CreatePushBody {
    pub owner: String,
    pub message: String,
    pub topic: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct DeleteResponse {
    pub deleted: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorBody { error: message })).into_response()
}

fn store_error_response(err: StoreError) -> Response {
    let status = match &err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::NotConnected | StoreError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
        StoreError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !err.is_client_fault() {
        error!("Store operation failed: {}", err);
    }
    error_response(status, err.to_string())
}

fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Notification not found".to_string())
}

fn parse_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid notification id: {}", raw),
        )
    })
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    Json(ServerStats {
        name: env!("CARGO_PKG_NAME"),
        version: VERSION,
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    })
}

async fn health(State(backend): State<GuardedBackend>) -> impl IntoResponse {
    let backend_connected = backend.is_healthy().await;
    Json(HealthResponse {
        status: if backend_connected {
            "healthy"
        } else {
            "unhealthy"
        },
        timestamp: Utc::now(),
        backend_connected,
        version: VERSION,
    })
}

async fn create_push(
    State(store): State<GuardedNotificationStore>,
    Json(body): Json<CreatePushBody>,
) -> Response {
    match store
        .create(&body.owner, &body.message, body.topic.as_deref())
        .await
    {
        Ok(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn get_push(
    State(store): State<GuardedNotificationStore>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match store.get(id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => not_found(),
        Err(err) => store_error_response(err),
    }
}

async fn delete_push(
    State(store): State<GuardedNotificationStore>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    match store.delete(id).await {
        Ok(true) => Json(DeleteResponse { deleted: true }).into_response(),
        Ok(false) => not_found(),
        Err(err) => store_error_response(err),
    }
}

async fn list_owner_pushes(
    State(store): State<GuardedNotificationStore>,
    Path(owner): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match store.list_by_owner(&owner, limit).await {
        Ok(notifications) => Json(notifications).into_response(),
        Err(err) => store_error_response(err),
    }
}

async fn list_topic_pushes(
    State(store): State<GuardedNotificationStore>,
    Path(topic): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    match store.list_by_topic(&topic, limit).await {
        Ok(notifications) => Json(notifications).into_response(),
        Err(err) => store_error_response(err),
    }
}

/// Answers a status transition with the updated record.
async fn transition_response(
    store: &NotificationStore,
    id: Uuid,
    updated: Result<bool, StoreError>,
) -> Response {
    match updated {
        Ok(true) => match store.get(id).await {
            Ok(Some(notification)) => Json(notification).into_response(),
            // Deleted or expired right after the update
            Ok(None) => not_found(),
            Err(err) => store_error_response(err),
        },
        Ok(false) => not_found(),
        Err(err) => store_error_response(err),
    }
}

async fn mark_sent(
    State(store): State<GuardedNotificationStore>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let updated = store.mark_as_sent(id).await;
    transition_response(&store, id, updated).await
}

async fn mark_delivered(
    State(store): State<GuardedNotificationStore>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let updated = store.mark_as_delivered(id).await;
    transition_response(&store, id, updated).await
}

async fn mark_failed(
    State(store): State<GuardedNotificationStore>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let updated = store.mark_as_failed(id).await;
    transition_response(&store, id, updated).await
}

pub fn make_app(
    config: ServerConfig,
    notification_store: GuardedNotificationStore,
    backend: GuardedBackend,
) -> Router {
    let state = ServerState::new(config, notification_store, backend);

    let push_routes: Router = Router::new()
        .route("/push", post(create_push))
        .route("/push/{id}", get(get_push).delete(delete_push))
        .route("/push/{id}/sent", post(mark_sent))
        .route("/push/{id}/delivered", post(mark_delivered))
        .route("/push/{id}/failed", post(mark_failed))
        .route("/push/owner/{owner}", get(list_owner_pushes))
        .route("/push/topic/{topic}", get(list_topic_pushes))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .with_state(state.clone());

    home_router
        .merge(push_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run_server(
    config: ServerConfig,
    notification_store: GuardedNotificationStore,
    backend: GuardedBackend,
) -> Result<()> {
    let address = format!("{}:{}", config.bind_address, config.port);
    let metrics_address = format!("{}:{}", config.bind_address, config.metrics_port);

    let metrics_listener = tokio::net::TcpListener::bind(&metrics_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {}", metrics_address))?;
    let metrics_app = Router::new().route("/metrics", get(metrics_handler));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", e);
        }
    });

    let app = make_app(config, notification_store, backend);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind server to {}", address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")
}
