//! Error classification shared by every engine component.
//!
//! Each component keeps its own error enum. The enums are classified into a
//! small set of kinds so outer layers (HTTP, CLI) can map them uniformly.

use serde::Serialize;

/// Broad category of an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or an illegal request shape
    Validation,
    /// A referenced entity does not exist
    NotFound,
    /// The request collides with current state (overlap, wrong state, capacity)
    Conflict,
    /// The caller is not allowed to touch the entity
    Forbidden,
    /// Storage or another dependency failed; the outcome may be unknown
    Downstream,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Downstream => "downstream",
        }
    }

    /// Whether retrying the same request could succeed without changes
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Downstream)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implemented by every component error enum.
pub trait DomainError: std::error::Error {
    /// Classification used for transport mapping
    fn kind(&self) -> ErrorKind;

    /// Get a client-safe error message that doesn't leak storage details
    fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Downstream => "Error interno del servidor".to_string(),
            _ => self.to_string(),
        }
    }
}
