use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::time::Duration;

/// Metric name prefix for all push store metrics
const PREFIX: &str = "pushstore";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Store Metrics
    pub static ref STORE_OPERATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_store_operations_total"), "Notification store operations"),
        &["operation", "outcome"]
    ).expect("Failed to create store_operations_total metric");

    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_store_operation_duration_seconds"),
            "Notification store operation duration in seconds"
        )
        .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation"]
    ).expect("Failed to create store_operation_duration_seconds metric");

    pub static ref INDEX_WRITE_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_index_write_failures_total"),
            "Secondary index writes that failed after the primary write succeeded"
        ),
        &["index", "operation"]
    ).expect("Failed to create index_write_failures_total metric");

    pub static ref STALE_INDEX_ENTRIES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_stale_index_entries_total"),
            "Index entries that pointed to a missing record"
        ),
        &["index"]
    ).expect("Failed to create stale_index_entries_total metric");
}

/// Initialize all metrics by registering them with the registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(STORE_OPERATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(INDEX_WRITE_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(STALE_INDEX_ENTRIES_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

/// Record an HTTP request with its method, path, status code, and duration
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

/// Record a completed store operation. `outcome` is "ok" or an error kind.
pub fn record_store_operation(operation: &str, outcome: &str, duration: Duration) {
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();

    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

pub fn record_index_write_failure(index: &str, operation: &str) {
    INDEX_WRITE_FAILURES_TOTAL
        .with_label_values(&[index, operation])
        .inc();
}

pub fn record_stale_index_entry(index: &str) {
    STALE_INDEX_ENTRIES_TOTAL.with_label_values(&[index]).inc();
}

/// Collapses ids out of request paths so label cardinality stays bounded.
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    match segments.as_slice() {
        ["", "push", "owner", _] => "/push/owner/{owner}".to_string(),
        ["", "push", "topic", _] => "/push/topic/{topic}".to_string(),
        ["", "push", _, action] => format!("/push/{{id}}/{}", action),
        ["", "push", _] => "/push/{id}".to_string(),
        _ => path.to_string(),
    }
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}
