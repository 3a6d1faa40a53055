//! Booking error types.
//!
//! Every variant maps to the [`BookingStep`] that failed so reconciliation can
//! tell where an attempt stopped.

use std::time::Duration;

use thiserror::Error;

use super::models::BookingStep;
use crate::catalog::{CatalogError, ClienteId, ServicioId};
use crate::db::timeouts::TimeoutError;
use crate::error::{DomainError, ErrorKind};
use crate::pago::PagoError;
use crate::pricing::TarifaError;
use crate::turno::TurnoError;

/// Booking errors
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Solicitud inválida: {0}")]
    InvalidRequest(String),

    #[error("Cliente {0} no encontrado")]
    ClienteNotFound(ClienteId),

    #[error("Servicio adicional {0} no encontrado")]
    ServicioNotFound(ServicioId),

    #[error("El servicio '{nombre}' no está activo")]
    ServicioInactive { id: ServicioId, nombre: String },

    #[error("Cantidad inválida ({cantidad}) para el servicio {id_servicio}")]
    InvalidQuantity { id_servicio: ServicioId, cantidad: i64 },

    #[error("El servicio de luz {0} ya se cobra automáticamente en este horario")]
    LightingAlreadyCharged(ServicioId),

    #[error("El importe de la reserva excede el rango representable")]
    Overflow,

    #[error("No se pudo cotizar el turno: {0}")]
    Quote(#[source] TarifaError),

    #[error("Falló el paso {step} del pago: {source}")]
    Payment {
        step: BookingStep,
        #[source]
        source: PagoError,
    },

    #[error("No se pudo reservar el turno: {0}")]
    Reservation(#[source] TurnoError),

    #[error("Database error en el paso {step}: {source}")]
    Database {
        step: BookingStep,
        #[source]
        source: sqlx::Error,
    },

    #[error("El paso {step} excedió el tiempo límite de {duration:?}")]
    Timeout { step: BookingStep, duration: Duration },

    #[error(transparent)]
    Catalog(CatalogError),
}

impl BookingError {
    /// Pipeline step that failed
    pub fn step(&self) -> BookingStep {
        match self {
            BookingError::InvalidRequest(_)
            | BookingError::ClienteNotFound(_)
            | BookingError::ServicioNotFound(_)
            | BookingError::ServicioInactive { .. }
            | BookingError::InvalidQuantity { .. }
            | BookingError::LightingAlreadyCharged(_)
            | BookingError::Overflow
            | BookingError::Catalog(_) => BookingStep::Validacion,
            BookingError::Quote(_) => BookingStep::Cotizacion,
            BookingError::Payment { step, .. }
            | BookingError::Database { step, .. }
            | BookingError::Timeout { step, .. } => *step,
            BookingError::Reservation(_) => BookingStep::Reserva,
        }
    }

    pub fn database(step: BookingStep, source: sqlx::Error) -> Self {
        BookingError::Database { step, source }
    }

    pub fn payment(step: BookingStep, source: PagoError) -> Self {
        BookingError::Payment { step, source }
    }
}

impl DomainError for BookingError {
    fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidRequest(_)
            | BookingError::ServicioInactive { .. }
            | BookingError::InvalidQuantity { .. }
            | BookingError::LightingAlreadyCharged(_)
            | BookingError::Overflow => ErrorKind::Validation,
            BookingError::ClienteNotFound(_) | BookingError::ServicioNotFound(_) => {
                ErrorKind::NotFound
            }
            BookingError::Quote(e) => e.kind(),
            BookingError::Payment { source, .. } => source.kind(),
            BookingError::Reservation(e) => e.kind(),
            BookingError::Catalog(e) => e.kind(),
            BookingError::Database { .. } | BookingError::Timeout { .. } => {
                ErrorKind::Downstream
            }
        }
    }
}

impl From<TimeoutError> for BookingError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => BookingError::Timeout {
                step: BookingStep::Transaccion,
                duration,
            },
            TimeoutError::Database(source) => BookingError::Database {
                step: BookingStep::Transaccion,
                source,
            },
        }
    }
}

/// Result type for booking operations
pub type BookingResult<T> = Result<T, BookingError>;
