//! Prometheus metrics for monitoring booking server health and throughput.
//!
//! Metrics are exposed in Prometheus text format by a dedicated listener
//! (`METRICS_BIND`). Without an installed exporter every call is a no-op.
//!
//! # Metrics Categories
//!
//! - **HTTP Metrics**: Request counts, duration, status codes
//! - **Booking Metrics**: Outcomes per pipeline step, booked amounts
//! - **Ledger Metrics**: Payment state changes
//! - **Turno Metrics**: Elapsed reservations closed by the background task
//! - **Storage Metrics**: Backend health
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use turnero_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/turnos/{id}/reservar", 200);
//! metrics::bookings_total("confirmada");
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
///
/// # Returns
///
/// Result indicating success or error message
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
///
/// Increments the total HTTP request counter with method, path, and status labels.
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
// Booking Metrics
// ============================================================================

/// Count a booking attempt by outcome (`confirmada` or the failed step).
pub fn bookings_total(outcome: &str) {
    metrics::counter!("bookings_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the total amount of a confirmed booking, in minor units.
pub fn booking_amount(monto_total: i64) {
    metrics::histogram!("booking_amount").record(monto_total as f64);
}

// ============================================================================
// Ledger Metrics
// ============================================================================

/// Count a payment state change (`iniciado`, `completado`, `fallido`).
pub fn pagos_total(estado: &str) {
    metrics::counter!("pagos_total",
        "estado" => estado.to_string()
    )
    .increment(1);
}

// ============================================================================
// Turno Metrics
// ============================================================================

/// Add reservations closed by the closure task.
pub fn turnos_finalizados_total(count: usize) {
    metrics::counter!("turnos_finalizados_total").increment(count as u64);
}

// ============================================================================
// Storage Metrics
// ============================================================================

/// Set storage health (1 healthy, 0 unhealthy).
pub fn storage_healthy(healthy: bool) {
    metrics::gauge!("storage_healthy").set(if healthy { 1.0 } else { 0.0 });
}
