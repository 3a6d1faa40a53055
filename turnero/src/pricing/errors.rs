//! Tariff resolution error types.

use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::catalog::{CanchaId, CatalogError};
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};

/// Tariff resolution errors
#[derive(Debug, Error)]
pub enum TarifaError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Identificador de cancha inválido: {0}")]
    InvalidCancha(CanchaId),

    #[error("La fecha de fin ({fin}) debe ser posterior a la de inicio ({inicio})")]
    InvalidInterval {
        inicio: NaiveDateTime,
        fin: NaiveDateTime,
    },

    #[error("El importe calculado excede el rango representable")]
    Overflow,

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl DomainError for TarifaError {
    fn kind(&self) -> ErrorKind {
        match self {
            TarifaError::Database(_) | TarifaError::Timeout(_) => ErrorKind::Downstream,
            TarifaError::InvalidCancha(_)
            | TarifaError::InvalidInterval { .. }
            | TarifaError::Overflow => ErrorKind::Validation,
            TarifaError::Catalog(e) => e.kind(),
        }
    }
}

impl From<TimeoutError> for TarifaError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => TarifaError::Timeout(d),
            TimeoutError::Database(e) => TarifaError::Database(e),
        }
    }
}

/// Result type for tariff resolution
pub type TarifaResult<T> = Result<T, TarifaError>;
