//! Payment error types.

use std::time::Duration;

use thiserror::Error;

use super::models::{PagoId, PagoState};
use crate::catalog::{CatalogError, ClienteId};
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};
use crate::turno::{TurnoError, TurnoId};

/// Payment ledger errors
#[derive(Debug, Error)]
pub enum PagoError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Pago {0} no encontrado")]
    NotFound(PagoId),

    #[error("Cliente {0} no encontrado")]
    ClienteNotFound(ClienteId),

    #[error("Turno {0} no encontrado")]
    TurnoNotFound(TurnoId),

    /// Invalid amount (must be zero or positive)
    #[error("Monto inválido: {0}")]
    InvalidAmount(i64),

    #[error(
        "Montos inconsistentes: turno {monto_turno} + servicios {monto_servicios} != total {monto_total}"
    )]
    AmountMismatch {
        monto_turno: i64,
        monto_servicios: i64,
        monto_total: i64,
    },

    #[error("El monto total excede el rango representable")]
    Overflow,

    #[error("Estado de pago desconocido: {0}")]
    InvalidState(String),

    /// Confirming or failing a pago that already left `iniciado`
    #[error("El pago {id} ya fue procesado (estado: {estado})")]
    AlreadyProcessed { id: PagoId, estado: PagoState },

    #[error("El pago {0} expiró y no puede confirmarse")]
    Expired(PagoId),

    #[error("El turno {0} ya tiene un pago completado")]
    TurnoAlreadyPaid(TurnoId),

    /// The pago is the proof of a live reservation
    #[error("El pago {id} respalda la reserva vigente del turno {id_turno}")]
    BacksReservation { id: PagoId, id_turno: TurnoId },

    /// The linked turno could not be reserved; the pago stays `iniciado`
    #[error("No se pudo reservar el turno del pago: {0}")]
    Reservation(#[source] TurnoError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl DomainError for PagoError {
    fn kind(&self) -> ErrorKind {
        match self {
            PagoError::Database(_) | PagoError::Timeout(_) => ErrorKind::Downstream,
            PagoError::NotFound(_)
            | PagoError::ClienteNotFound(_)
            | PagoError::TurnoNotFound(_) => ErrorKind::NotFound,
            PagoError::InvalidAmount(_)
            | PagoError::AmountMismatch { .. }
            | PagoError::Overflow
            | PagoError::InvalidState(_) => ErrorKind::Validation,
            PagoError::AlreadyProcessed { .. }
            | PagoError::Expired(_)
            | PagoError::TurnoAlreadyPaid(_)
            | PagoError::BacksReservation { .. } => ErrorKind::Conflict,
            PagoError::Reservation(e) => e.kind(),
            PagoError::Catalog(e) => e.kind(),
        }
    }
}

impl From<TimeoutError> for PagoError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => PagoError::Timeout(d),
            TimeoutError::Database(e) => PagoError::Database(e),
        }
    }
}

impl From<TurnoError> for PagoError {
    fn from(err: TurnoError) -> Self {
        PagoError::Reservation(err)
    }
}

/// Result type for payment operations
pub type PagoResult<T> = Result<T, PagoError>;
