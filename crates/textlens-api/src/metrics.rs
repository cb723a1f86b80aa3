//! Prometheus metrics for the serving layer.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use textlens_models::RequestLogEntry;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle used to render the `/metrics` endpoint.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "textlens_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "textlens_http_request_duration_seconds";

    pub const WS_CONNECTIONS_TOTAL: &str = "textlens_ws_connections_total";
    pub const WS_CONNECTIONS_ACTIVE: &str = "textlens_ws_connections_active";
    pub const WS_MESSAGES_RECEIVED: &str = "textlens_ws_messages_received_total";

    pub const RECOGNITIONS_TOTAL: &str = "textlens_recognitions_total";
}

/// Record one completed HTTP exchange.
pub fn record_http_request(entry: &RequestLogEntry) {
    let labels = [
        ("method", entry.method.clone()),
        ("path", entry.path.clone()),
        ("status", entry.status_code.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels)
        .record(entry.duration_ms as f64 / 1000.0);
}

/// Record a new WebSocket connection.
pub fn record_ws_connection() {
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
}

/// Update the active WebSocket connections gauge.
pub fn set_ws_active_connections(count: usize) {
    gauge!(names::WS_CONNECTIONS_ACTIVE).set(count as f64);
}

/// Record an inbound WebSocket message by type.
pub fn record_ws_message(message_type: &str) {
    let labels = [("type", message_type.to_string())];
    counter!(names::WS_MESSAGES_RECEIVED, &labels).increment(1);
}

/// Record a recognition outcome on either path.
pub fn record_recognition(outcome: &'static str) {
    let labels = [("outcome", outcome)];
    counter!(names::RECOGNITIONS_TOTAL, &labels).increment(1);
}
