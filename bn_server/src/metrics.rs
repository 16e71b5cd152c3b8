//! Prometheus metrics.
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so
//! handlers record unconditionally.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Increment login attempts counter.
pub fn login_attempts_total(success: bool) {
    metrics::counter!("login_attempts_total",
        "success" => success.to_string()
    )
    .increment(1);
}

/// Increment registrations counter.
pub fn registrations_total() {
    metrics::counter!("registrations_total").increment(1);
}

/// Increment rejected-token counter, labelled by the rejection reason.
pub fn token_rejections_total(reason: &'static str) {
    metrics::counter!("token_rejections_total", "reason" => reason).increment(1);
}
