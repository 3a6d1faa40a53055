//! Catalog error types.

use std::time::Duration;

use thiserror::Error;

use super::models::{CanchaId, ClienteId, ServicioId};
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};

/// Catalog errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage operation exceeded its deadline
    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Cancha {0} no encontrada")]
    CanchaNotFound(CanchaId),

    #[error("Servicio adicional {0} no encontrado")]
    ServicioNotFound(ServicioId),

    #[error("Cliente {0} no encontrado")]
    ClienteNotFound(ClienteId),

    /// Invalid amount (must be zero or positive)
    #[error("Precio inválido: {0}")]
    InvalidPrice(i64),

    #[error("Campo '{field}' inválido: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl DomainError for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Database(_) | CatalogError::Timeout(_) => ErrorKind::Downstream,
            CatalogError::CanchaNotFound(_)
            | CatalogError::ServicioNotFound(_)
            | CatalogError::ClienteNotFound(_) => ErrorKind::NotFound,
            CatalogError::InvalidPrice(_) | CatalogError::InvalidField { .. } => {
                ErrorKind::Validation
            }
        }
    }
}

impl From<TimeoutError> for CatalogError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => CatalogError::Timeout(d),
            TimeoutError::Database(e) => CatalogError::Database(e),
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
