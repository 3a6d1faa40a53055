//! Tournament matches.
//!
//! A partido belongs to one torneo and may be scheduled on a turno that
//! torneo has claimed. The claim is checked by the store when the partido
//! is written; a later release leaves the partido pointing at the turno.

use serde::{Deserialize, Serialize};

use super::errors::{TorneoError, TorneoResult};
use super::models::{double_option, TorneoId};
use crate::equipo::EquipoId;
use crate::turno::TurnoId;

/// Partido ID type
pub type PartidoId = i64;

/// Match state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartidoState {
    #[default]
    Programado,
    EnJuego,
    Finalizado,
    Suspendido,
}

impl PartidoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartidoState::Programado => "programado",
            PartidoState::EnJuego => "en_juego",
            PartidoState::Finalizado => "finalizado",
            PartidoState::Suspendido => "suspendido",
        }
    }
}

impl std::fmt::Display for PartidoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PartidoState {
    type Err = TorneoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "programado" => Ok(PartidoState::Programado),
            "en_juego" => Ok(PartidoState::EnJuego),
            "finalizado" => Ok(PartidoState::Finalizado),
            "suspendido" => Ok(PartidoState::Suspendido),
            other => Err(TorneoError::InvalidField {
                field: "estado",
                reason: format!("estado de partido desconocido: {other}"),
            }),
        }
    }
}

/// Tournament match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partido {
    pub id: PartidoId,
    pub id_torneo: TorneoId,
    pub id_turno: Option<TurnoId>,
    pub id_equipo_local: Option<EquipoId>,
    pub id_equipo_visitante: Option<EquipoId>,
    pub id_equipo_ganador: Option<EquipoId>,
    pub ronda: Option<String>,
    pub marcador_local: Option<i32>,
    pub marcador_visitante: Option<i32>,
    pub estado: PartidoState,
}

impl Partido {
    /// Teams that the store must find enrolled in the torneo
    pub fn equipos(&self) -> impl Iterator<Item = EquipoId> + '_ {
        [self.id_equipo_local, self.id_equipo_visitante]
            .into_iter()
            .flatten()
    }

    pub fn validate(&self) -> TorneoResult<()> {
        let invalid = |field: &'static str, reason: &str| TorneoError::InvalidField {
            field,
            reason: reason.to_string(),
        };

        if let (Some(local), Some(visitante)) = (self.id_equipo_local, self.id_equipo_visitante) {
            if local == visitante {
                return Err(invalid("id_equipo_visitante", "debe ser distinto del local"));
            }
        }
        if let Some(ganador) = self.id_equipo_ganador {
            if Some(ganador) != self.id_equipo_local && Some(ganador) != self.id_equipo_visitante {
                return Err(invalid("id_equipo_ganador", "debe ser el local o el visitante"));
            }
        }
        if self.marcador_local.is_some_and(|m| m < 0) {
            return Err(invalid("marcador_local", "no puede ser negativo"));
        }
        if self.marcador_visitante.is_some_and(|m| m < 0) {
            return Err(invalid("marcador_visitante", "no puede ser negativo"));
        }
        Ok(())
    }
}

/// Request to create a partido
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartido {
    pub id_torneo: TorneoId,
    #[serde(default)]
    pub id_turno: Option<TurnoId>,
    #[serde(default)]
    pub id_equipo_local: Option<EquipoId>,
    #[serde(default)]
    pub id_equipo_visitante: Option<EquipoId>,
    #[serde(default)]
    pub id_equipo_ganador: Option<EquipoId>,
    #[serde(default)]
    pub ronda: Option<String>,
    #[serde(default)]
    pub marcador_local: Option<i32>,
    #[serde(default)]
    pub marcador_visitante: Option<i32>,
    #[serde(default)]
    pub estado: PartidoState,
}

impl NewPartido {
    pub fn new(id_torneo: TorneoId) -> Self {
        Self {
            id_torneo,
            id_turno: None,
            id_equipo_local: None,
            id_equipo_visitante: None,
            id_equipo_ganador: None,
            ronda: None,
            marcador_local: None,
            marcador_visitante: None,
            estado: PartidoState::Programado,
        }
    }

    pub fn on_turno(mut self, id_turno: TurnoId) -> Self {
        self.id_turno = Some(id_turno);
        self
    }

    pub fn between(mut self, local: EquipoId, visitante: EquipoId) -> Self {
        self.id_equipo_local = Some(local);
        self.id_equipo_visitante = Some(visitante);
        self
    }

    /// The record this request would store under `id`
    pub fn into_partido(self, id: PartidoId) -> Partido {
        Partido {
            id,
            id_torneo: self.id_torneo,
            id_turno: self.id_turno,
            id_equipo_local: self.id_equipo_local,
            id_equipo_visitante: self.id_equipo_visitante,
            id_equipo_ganador: self.id_equipo_ganador,
            ronda: self.ronda,
            marcador_local: self.marcador_local,
            marcador_visitante: self.marcador_visitante,
            estado: self.estado,
        }
    }
}

/// Partial update; nullable fields use `Some(None)` to clear.
///
/// The owning torneo cannot change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PartidoUpdate {
    #[serde(default, deserialize_with = "double_option")]
    pub id_turno: Option<Option<TurnoId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub id_equipo_local: Option<Option<EquipoId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub id_equipo_visitante: Option<Option<EquipoId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub id_equipo_ganador: Option<Option<EquipoId>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ronda: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub marcador_local: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub marcador_visitante: Option<Option<i32>>,
    #[serde(default)]
    pub estado: Option<PartidoState>,
}

impl PartidoUpdate {
    pub fn apply_to(&self, partido: &Partido) -> TorneoResult<Partido> {
        let mut next = partido.clone();
        if let Some(id_turno) = self.id_turno {
            next.id_turno = id_turno;
        }
        if let Some(local) = self.id_equipo_local {
            next.id_equipo_local = local;
        }
        if let Some(visitante) = self.id_equipo_visitante {
            next.id_equipo_visitante = visitante;
        }
        if let Some(ganador) = self.id_equipo_ganador {
            next.id_equipo_ganador = ganador;
        }
        if let Some(ronda) = &self.ronda {
            next.ronda = ronda.clone();
        }
        if let Some(marcador) = self.marcador_local {
            next.marcador_local = marcador;
        }
        if let Some(marcador) = self.marcador_visitante {
            next.marcador_visitante = marcador;
        }
        if let Some(estado) = self.estado {
            next.estado = estado;
        }
        next.validate()?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartidoFilter {
    #[serde(default)]
    pub id_torneo: Option<TorneoId>,
    #[serde(default)]
    pub id_turno: Option<TurnoId>,
}

impl PartidoFilter {
    pub fn matches(&self, partido: &Partido) -> bool {
        self.id_torneo.is_none_or(|t| partido.id_torneo == t)
            && self.id_turno.is_none_or(|t| partido.id_turno == Some(t))
    }
}
