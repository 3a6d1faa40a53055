//! Tournament error types.

use std::time::Duration;

use thiserror::Error;

use super::models::{TorneoId, TorneoState};
use super::partido::PartidoId;
use crate::db::timeouts::TimeoutError;
use crate::equipo::EquipoId;
use crate::error::{DomainError, ErrorKind};
use crate::turno::{TurnoError, TurnoId};

/// Tournament errors
#[derive(Debug, Error)]
pub enum TorneoError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("La operación excedió el tiempo límite de {0:?}")]
    Timeout(Duration),

    #[error("Torneo {0} no encontrado")]
    NotFound(TorneoId),

    #[error("Equipo {0} no encontrado")]
    EquipoNotFound(EquipoId),

    #[error("Campo '{field}' inválido: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Estado de torneo desconocido: {0}")]
    InvalidState(String),

    #[error("No se puede reducir los cupos a {cupos}: hay {enrolled} equipos inscritos")]
    CapacityBelowEnrolled { cupos: i32, enrolled: i64 },

    #[error("El torneo {id} no tiene cupos disponibles (cupos: {cupos})")]
    Full { id: TorneoId, cupos: i32 },

    #[error("El torneo {id} no admite inscripciones (estado: {estado})")]
    Closed { id: TorneoId, estado: TorneoState },

    #[error("El equipo {id_equipo} ya está inscrito en el torneo {id_torneo}")]
    AlreadyEnrolled {
        id_equipo: EquipoId,
        id_torneo: TorneoId,
    },

    #[error("El equipo {id_equipo} no está inscrito en el torneo {id_torneo}")]
    NotEnrolled {
        id_equipo: EquipoId,
        id_torneo: TorneoId,
    },

    #[error("Partido {0} no encontrado")]
    PartidoNotFound(PartidoId),

    #[error("El turno {id_turno} no está asignado al torneo {id_torneo}")]
    TurnoNotClaimed {
        id_turno: TurnoId,
        id_torneo: TorneoId,
    },

    #[error("El turno {id_turno} ya tiene el partido {id_partido}")]
    TurnoInUse {
        id_turno: TurnoId,
        id_partido: PartidoId,
    },

    #[error(transparent)]
    Turno(#[from] TurnoError),
}

impl DomainError for TorneoError {
    fn kind(&self) -> ErrorKind {
        match self {
            TorneoError::Database(_) | TorneoError::Timeout(_) => ErrorKind::Downstream,
            TorneoError::NotFound(_)
            | TorneoError::EquipoNotFound(_)
            | TorneoError::PartidoNotFound(_)
            | TorneoError::NotEnrolled { .. } => ErrorKind::NotFound,
            TorneoError::InvalidField { .. }
            | TorneoError::InvalidState(_)
            | TorneoError::CapacityBelowEnrolled { .. } => ErrorKind::Validation,
            TorneoError::Full { .. }
            | TorneoError::Closed { .. }
            | TorneoError::AlreadyEnrolled { .. }
            | TorneoError::TurnoNotClaimed { .. }
            | TorneoError::TurnoInUse { .. } => ErrorKind::Conflict,
            TorneoError::Turno(e) => e.kind(),
        }
    }
}

impl From<TimeoutError> for TorneoError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(d) => TorneoError::Timeout(d),
            TimeoutError::Database(e) => TorneoError::Database(e),
        }
    }
}

/// Result type for tournament operations
pub type TorneoResult<T> = Result<T, TorneoError>;
