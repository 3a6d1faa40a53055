//! Turno error types.

use std::time::Duration;

use chrono::NaiveDateTime;
use thiserror::Error;

use super::models::{TurnoId, TurnoState};
use crate::catalog::{CanchaId, CatalogError, ClienteId};
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};
use crate::pricing::TarifaError;
use crate::torneo::TorneoId;

/// Turno errors
#[derive(Debug, Error)]
pub enum TurnoError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage operation exceeded its deadline
    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Turno {0} no encontrado")]
    NotFound(TurnoId),

    #[error("Cancha {0} no encontrada")]
    CanchaNotFound(CanchaId),

    #[error("La cancha {0} no está activa")]
    CanchaInactive(CanchaId),

    #[error("Cliente {0} no encontrado")]
    ClienteNotFound(ClienteId),

    #[error("La fecha de fin ({fin}) debe ser posterior a la de inicio ({inicio})")]
    InvalidInterval {
        inicio: NaiveDateTime,
        fin: NaiveDateTime,
    },

    #[error("Estado de turno desconocido: {0}")]
    InvalidState(String),

    #[error("Motivo de bloqueo inválido: {0}")]
    InvalidMotivo(String),

    #[error("Falta el campo requerido '{0}'")]
    MissingField(&'static str),

    #[error("Torneo {0} no encontrado")]
    TorneoNotFound(TorneoId),

    #[error("El monto total del turno excede el rango permitido")]
    Overflow,

    /// The turno is not in `disponible`
    #[error("El turno {id} ya no está disponible (estado actual: {estado})")]
    NotAvailable { id: TurnoId, estado: TurnoState },

    /// Another occupying turno on the same cancha intersects the interval
    #[error("El turno {id} se superpone con el turno {other} ocupado en la misma cancha")]
    Overlap { id: TurnoId, other: TurnoId },

    #[error("Transición inválida para el turno {id}: {from} → {to}")]
    InvalidTransition {
        id: TurnoId,
        from: TurnoState,
        to: TurnoState,
    },

    #[error("El turno {id} ya está bloqueado ({motivo})")]
    AlreadyBlocked { id: TurnoId, motivo: String },

    #[error("El turno {id} no pertenece al torneo {id_torneo}")]
    NotOwned { id: TurnoId, id_torneo: TorneoId },

    #[error("El turno {id} no está reservado por el cliente {id_cliente}")]
    NotReservedBy { id: TurnoId, id_cliente: ClienteId },

    /// Reserving requires a completado pago for the same turno and client
    #[error("El turno {0} requiere un pago completado del cliente para ser reservado")]
    PaymentRequired(TurnoId),

    #[error("El turno {0} ya finalizó y no puede cancelarse")]
    AlreadyElapsed(TurnoId),

    #[error("El turno {0} todavía no terminó")]
    NotYetEnded(TurnoId),

    #[error("El turno {0} tiene un pago completado y no puede eliminarse")]
    HasCompletedPayment(TurnoId),

    #[error("El turno {0} está ocupado y no puede eliminarse")]
    Occupied(TurnoId),

    #[error(transparent)]
    Tarifa(#[from] TarifaError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl DomainError for TurnoError {
    fn kind(&self) -> ErrorKind {
        match self {
            TurnoError::Database(_) | TurnoError::Timeout(_) => ErrorKind::Downstream,
            TurnoError::NotFound(_)
            | TurnoError::CanchaNotFound(_)
            | TurnoError::ClienteNotFound(_)
            | TurnoError::TorneoNotFound(_) => ErrorKind::NotFound,
            TurnoError::CanchaInactive(_)
            | TurnoError::InvalidInterval { .. }
            | TurnoError::InvalidState(_)
            | TurnoError::InvalidMotivo(_)
            | TurnoError::MissingField(_)
            | TurnoError::Overflow => ErrorKind::Validation,
            TurnoError::NotAvailable { .. }
            | TurnoError::Overlap { .. }
            | TurnoError::InvalidTransition { .. }
            | TurnoError::AlreadyBlocked { .. }
            | TurnoError::PaymentRequired(_)
            | TurnoError::AlreadyElapsed(_)
            | TurnoError::NotYetEnded(_)
            | TurnoError::HasCompletedPayment(_)
            | TurnoError::Occupied(_) => ErrorKind::Conflict,
            TurnoError::NotOwned { .. } | TurnoError::NotReservedBy { .. } => {
                ErrorKind::Forbidden
            }
            TurnoError::Tarifa(e) => e.kind(),
            TurnoError::Catalog(e) => e.kind(),
        }
    }
}

impl From<TimeoutError> for TurnoError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => TurnoError::Timeout(d),
            TimeoutError::Database(e) => TurnoError::Database(e),
        }
    }
}

/// Result type for turno operations
pub type TurnoResult<T> = Result<T, TurnoError>;
