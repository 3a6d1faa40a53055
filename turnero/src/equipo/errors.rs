//! Team error types.

use std::time::Duration;

use thiserror::Error;

use super::models::EquipoId;
use crate::catalog::ClienteId;
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};

/// Team roster errors
#[derive(Debug, Error)]
pub enum EquipoError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Equipo {0} no encontrado")]
    NotFound(EquipoId),

    #[error("Cliente {0} no encontrado")]
    ClienteNotFound(ClienteId),

    #[error("El nombre del equipo no puede estar vacío")]
    InvalidName,

    #[error("Ya existe un equipo llamado '{0}'")]
    DuplicateName(String),
}

impl DomainError for EquipoError {
    fn kind(&self) -> ErrorKind {
        match self {
            EquipoError::Database(_) | EquipoError::Timeout(_) => ErrorKind::Downstream,
            EquipoError::NotFound(_) | EquipoError::ClienteNotFound(_) => ErrorKind::NotFound,
            EquipoError::InvalidName => ErrorKind::Validation,
            EquipoError::DuplicateName(_) => ErrorKind::Conflict,
        }
    }
}

impl From<TimeoutError> for EquipoError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => EquipoError::Timeout(d),
            TimeoutError::Database(e) => EquipoError::Database(e),
        }
    }
}

/// Result type for team operations
pub type EquipoResult<T> = Result<T, EquipoError>;
