//! Caller identity and request tracking middleware.
//!
//! State-changing requests must name the operator performing them in the
//! `X-Usuario-Id` header. The identity is injected into request extensions
//! as [`Caller`] and used as `id_usuario_registro` / `id_usuario_bloqueo`
//! by the handlers.
//!
//! # Extracting the caller
//!
//! ```rust,no_run
//! use turnero_server::api::middleware::Caller;
//!
//! async fn protected_handler(caller: Caller) -> String {
//!     format!("Operador {}", caller.0)
//! }
//! # let _ = protected_handler;
//! ```

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderMap, Method},
    middleware::Next,
    response::Response,
};
use turnero::catalog::UsuarioId;

use super::error::ApiError;
use crate::{logging, metrics};

/// Header carrying the caller identity
pub const USUARIO_HEADER: &str = "x-usuario-id";

/// Authenticated operator of a state-changing request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller(pub UsuarioId);

fn parse_caller(headers: &HeaderMap) -> Option<UsuarioId> {
    headers
        .get(USUARIO_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<UsuarioId>().ok())
        .filter(|id| *id > 0)
}

fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Require a caller identity on state-changing requests.
///
/// # Behavior
///
/// - **Valid header**: Injects [`Caller`] into request extensions
/// - **Missing or invalid header on GET/HEAD/OPTIONS**: Passes through
/// - **Missing or invalid header otherwise**: Returns `401 Unauthorized`
pub async fn caller_middleware(mut request: Request, next: Next) -> Result<Response, ApiError> {
    match parse_caller(request.headers()) {
        Some(id) => {
            request.extensions_mut().insert(Caller(id));
        }
        None if is_read_only(request.method()) => {}
        None => {
            return Err(ApiError::unauthorized(format!(
                "Se requiere la cabecera {} con un identificador de usuario válido",
                USUARIO_HEADER
            )));
        }
    }
    Ok(next.run(request).await)
}

/// Record metrics and a completion log line for every routed request
pub async fn track_requests(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let caller = parse_caller(request.headers());

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status().as_u16();
    metrics::http_requests_total(method.as_str(), &path, status);
    metrics::http_request_duration_ms(method.as_str(), &path, duration.as_secs_f64() * 1000.0);
    logging::log_api_request(
        method.as_str(),
        &path,
        status,
        duration.as_millis() as u64,
        caller,
    );
    response
}

impl<S> axum::extract::FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .copied()
            .ok_or_else(|| ApiError::unauthorized("Identidad del usuario no disponible"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_caller() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_caller(&headers), None);

        headers.insert(USUARIO_HEADER, HeaderValue::from_static("42"));
        assert_eq!(parse_caller(&headers), Some(42));

        headers.insert(USUARIO_HEADER, HeaderValue::from_static("0"));
        assert_eq!(parse_caller(&headers), None);

        headers.insert(USUARIO_HEADER, HeaderValue::from_static("admin"));
        assert_eq!(parse_caller(&headers), None);
    }

    #[test]
    fn test_read_only_methods() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::HEAD));
        assert!(!is_read_only(&Method::POST));
        assert!(!is_read_only(&Method::PUT));
        assert!(!is_read_only(&Method::DELETE));
    }
}
