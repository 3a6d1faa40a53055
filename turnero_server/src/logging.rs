//! Structured logging configuration.
//!
//! The engine logs through the `log` facade; the subscriber installed here
//! also captures those records, so library and server events share one
//! output with request correlation.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn,hyper=warn";

/// Initialize structured logging
///
/// Levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use turnero_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a booking pipeline event
///
/// # Arguments
///
/// * `event_type` - `reserva_confirmada`, `reserva_rechazada`, ...
/// * `id_turno` - Turno involved
/// * `id_cliente` - Optional client
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use turnero_server::logging::log_booking_event;
///
/// log_booking_event("reserva_confirmada", 42, Some(7), "Pago 13 completado");
/// ```
pub fn log_booking_event(event_type: &str, id_turno: i64, id_cliente: Option<i64>, message: &str) {
    tracing::info!(
        event_type = event_type,
        id_turno = id_turno,
        id_cliente = id_cliente,
        "BOOKING: {}",
        message
    );
}

/// Log performance metric
///
/// # Arguments
///
/// * `operation` - Operation name
/// * `duration_ms` - Duration in milliseconds
/// * `metadata` - Additional metadata
///
/// # Example
///
/// ```
/// use turnero_server::logging::log_performance;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... do work ...
/// let duration = start.elapsed().as_millis() as u64;
/// log_performance("finish_elapsed", duration, Some("closure task"));
/// ```
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}

/// Log API request/response
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Matched route
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `id_usuario` - Caller identity, when supplied
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    id_usuario: Option<i64>,
) {
    if status_code >= 500 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            id_usuario = id_usuario,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            id_usuario = id_usuario,
            "API request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
    }

    #[test]
    fn test_log_booking_event() {
        // Just ensure it doesn't panic
        log_booking_event("reserva_confirmada", 1, Some(2), "Test message");
        log_booking_event("reserva_rechazada", 1, None, "Test message");
    }

    #[test]
    fn test_log_performance() {
        log_performance("test_operation", 500, Some("metadata"));
        log_performance("slow_operation", 2000, None);
    }

    #[test]
    fn test_log_api_request() {
        log_api_request("GET", "/api/v1/turnos", 200, 45, None);
        log_api_request("POST", "/api/v1/turnos/{id}/reservar", 503, 120, Some(9));
    }
}
