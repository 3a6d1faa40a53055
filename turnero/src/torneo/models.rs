//! Tournament data models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::{TorneoError, TorneoResult};
use crate::equipo::EquipoId;
use crate::turno::TurnoId;

/// Torneo ID type
pub type TorneoId = i64;

/// Tournament state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorneoState {
    Planificado,
    InscripcionesAbiertas,
    EnCurso,
    Finalizado,
    Cancelado,
}

impl TorneoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TorneoState::Planificado => "planificado",
            TorneoState::InscripcionesAbiertas => "inscripciones_abiertas",
            TorneoState::EnCurso => "en_curso",
            TorneoState::Finalizado => "finalizado",
            TorneoState::Cancelado => "cancelado",
        }
    }

    /// Teams may only join before play starts
    pub fn accepts_enrollment(&self) -> bool {
        matches!(
            self,
            TorneoState::Planificado | TorneoState::InscripcionesAbiertas
        )
    }
}

impl std::fmt::Display for TorneoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TorneoState {
    type Err = TorneoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planificado" => Ok(TorneoState::Planificado),
            "inscripciones_abiertas" => Ok(TorneoState::InscripcionesAbiertas),
            "en_curso" => Ok(TorneoState::EnCurso),
            "finalizado" => Ok(TorneoState::Finalizado),
            "cancelado" => Ok(TorneoState::Cancelado),
            other => Err(TorneoError::InvalidState(other.to_string())),
        }
    }
}

/// Tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Torneo {
    pub id: TorneoId,
    pub nombre: String,
    pub tipo_deporte: String,
    pub created_at: DateTime<Utc>,
    pub fecha_inicio: Option<NaiveDate>,
    pub fecha_fin: Option<NaiveDate>,
    pub costo_inscripcion: i64,
    /// Team capacity; `None` is unlimited
    pub cupos: Option<i32>,
    pub reglas: Option<String>,
    pub estado: TorneoState,
}

impl Torneo {
    /// `max(cupos - enrolled, 0)`, or `None` when capacity is unlimited
    pub fn remaining_slots(&self, enrolled: i64) -> Option<i64> {
        self.cupos.map(|c| (i64::from(c) - enrolled).max(0))
    }

    pub fn has_room(&self, enrolled: i64) -> bool {
        self.remaining_slots(enrolled).is_none_or(|r| r > 0)
    }
}

/// Request to create a torneo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTorneo {
    pub nombre: String,
    pub tipo_deporte: String,
    #[serde(default)]
    pub fecha_inicio: Option<NaiveDate>,
    #[serde(default)]
    pub fecha_fin: Option<NaiveDate>,
    #[serde(default)]
    pub costo_inscripcion: i64,
    #[serde(default)]
    pub cupos: Option<i32>,
    #[serde(default)]
    pub reglas: Option<String>,
    #[serde(default = "default_state")]
    pub estado: TorneoState,
}

impl NewTorneo {
    pub fn new(nombre: impl Into<String>, tipo_deporte: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            tipo_deporte: tipo_deporte.into(),
            fecha_inicio: None,
            fecha_fin: None,
            costo_inscripcion: 0,
            cupos: None,
            reglas: None,
            estado: TorneoState::Planificado,
        }
    }

    pub fn with_cupos(mut self, cupos: i32) -> Self {
        self.cupos = Some(cupos);
        self
    }

    pub fn validate(&self) -> TorneoResult<()> {
        validate_fields(
            &self.nombre,
            &self.tipo_deporte,
            self.costo_inscripcion,
            self.cupos,
            self.fecha_inicio,
            self.fecha_fin,
        )
    }
}

fn default_state() -> TorneoState {
    TorneoState::Planificado
}

/// Partial update; nullable fields use `Some(None)` to clear
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TorneoUpdate {
    #[serde(default)]
    pub nombre: Option<String>,
    #[serde(default)]
    pub tipo_deporte: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub fecha_inicio: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub fecha_fin: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub costo_inscripcion: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    pub cupos: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub reglas: Option<Option<String>>,
    #[serde(default)]
    pub estado: Option<TorneoState>,
}

impl TorneoUpdate {
    /// Produce the updated torneo, refusing a capacity below `enrolled`
    pub fn apply_to(&self, torneo: &Torneo, enrolled: i64) -> TorneoResult<Torneo> {
        let mut next = torneo.clone();
        if let Some(nombre) = &self.nombre {
            next.nombre = nombre.clone();
        }
        if let Some(tipo) = &self.tipo_deporte {
            next.tipo_deporte = tipo.clone();
        }
        if let Some(fecha) = self.fecha_inicio {
            next.fecha_inicio = fecha;
        }
        if let Some(fecha) = self.fecha_fin {
            next.fecha_fin = fecha;
        }
        if let Some(costo) = self.costo_inscripcion {
            next.costo_inscripcion = costo;
        }
        if let Some(cupos) = self.cupos {
            next.cupos = cupos;
        }
        if let Some(reglas) = &self.reglas {
            next.reglas = reglas.clone();
        }
        if let Some(estado) = self.estado {
            next.estado = estado;
        }

        validate_fields(
            &next.nombre,
            &next.tipo_deporte,
            next.costo_inscripcion,
            next.cupos,
            next.fecha_inicio,
            next.fecha_fin,
        )?;
        if let Some(cupos) = next.cupos {
            if i64::from(cupos) < enrolled {
                return Err(TorneoError::CapacityBelowEnrolled { cupos, enrolled });
            }
        }
        Ok(next)
    }
}

pub(super) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn validate_fields(
    nombre: &str,
    tipo_deporte: &str,
    costo_inscripcion: i64,
    cupos: Option<i32>,
    fecha_inicio: Option<NaiveDate>,
    fecha_fin: Option<NaiveDate>,
) -> TorneoResult<()> {
    let invalid = |field: &'static str, reason: &str| TorneoError::InvalidField {
        field,
        reason: reason.to_string(),
    };

    if nombre.trim().is_empty() {
        return Err(invalid("nombre", "no puede estar vacío"));
    }
    if tipo_deporte.trim().is_empty() {
        return Err(invalid("tipo_deporte", "no puede estar vacío"));
    }
    if costo_inscripcion < 0 {
        return Err(invalid("costo_inscripcion", "no puede ser negativo"));
    }
    if cupos.is_some_and(|c| c < 1) {
        return Err(invalid("cupos", "debe ser al menos 1"));
    }
    if let (Some(inicio), Some(fin)) = (fecha_inicio, fecha_fin) {
        if fin < inicio {
            return Err(invalid("fecha_fin", "no puede ser anterior a fecha_inicio"));
        }
    }
    Ok(())
}

/// Team enrollment in a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inscripcion {
    pub id_equipo: EquipoId,
    pub id_torneo: TorneoId,
    pub fecha_inscripcion: Option<DateTime<Utc>>,
}

/// Identity of an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InscripcionKey {
    pub id_equipo: EquipoId,
    pub id_torneo: TorneoId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InscripcionFilter {
    #[serde(default)]
    pub id_torneo: Option<TorneoId>,
    #[serde(default)]
    pub id_equipo: Option<EquipoId>,
}

impl InscripcionFilter {
    pub fn matches(&self, inscripcion: &Inscripcion) -> bool {
        self.id_torneo.is_none_or(|t| inscripcion.id_torneo == t)
            && self.id_equipo.is_none_or(|e| inscripcion.id_equipo == e)
    }
}

/// Per-team outcome of an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum EnrollOutcome {
    Inscrito,
    YaInscrito,
    SinCupo,
    NoEncontrado,
    Rechazado { motivo: String },
    Fallido { motivo: String },
}

/// Per-pair outcome of a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum WithdrawOutcome {
    Retirado,
    NoInscrito,
    Fallido { motivo: String },
}

/// Per-turno outcome of a tournament claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum AssignOutcome {
    Asignado,
    YaAsignado,
    /// Conflict or validation failure; retrying will not help
    Rechazado { motivo: String },
    /// Storage failure; the item may be retried
    Fallido { motivo: String },
}

/// Per-turno outcome of a tournament release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum ReleaseOutcome {
    Liberado,
    YaDisponible,
    Rechazado { motivo: String },
    Fallido { motivo: String },
}

/// What a torneo deletion cascaded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TorneoRemoval {
    pub id_torneo: TorneoId,
    pub turnos_liberados: Vec<TurnoId>,
    pub inscripciones_eliminadas: u64,
    pub partidos_eliminados: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torneo(cupos: Option<i32>) -> Torneo {
        Torneo {
            id: 1,
            nombre: "Apertura".into(),
            tipo_deporte: "futbol".into(),
            created_at: Utc::now(),
            fecha_inicio: None,
            fecha_fin: None,
            costo_inscripcion: 0,
            cupos,
            reglas: None,
            estado: TorneoState::Planificado,
        }
    }

    #[test]
    fn test_remaining_slots_never_negative() {
        let t = torneo(Some(2));
        assert_eq!(t.remaining_slots(0), Some(2));
        assert_eq!(t.remaining_slots(2), Some(0));
        assert_eq!(t.remaining_slots(5), Some(0));
        assert!(t.has_room(1));
        assert!(!t.has_room(2));
        assert_eq!(torneo(None).remaining_slots(100), None);
        assert!(torneo(None).has_room(100));
    }

    #[test]
    fn test_new_torneo_validation() {
        assert!(NewTorneo::new("Apertura", "futbol").validate().is_ok());
        assert!(NewTorneo::new("", "futbol").validate().is_err());
        assert!(NewTorneo::new("Apertura", " ").validate().is_err());
        assert!(NewTorneo::new("Apertura", "futbol").with_cupos(0).validate().is_err());

        let mut fechas = NewTorneo::new("Apertura", "futbol");
        fechas.fecha_inicio = NaiveDate::from_ymd_opt(2025, 5, 10);
        fechas.fecha_fin = NaiveDate::from_ymd_opt(2025, 5, 1);
        assert!(matches!(
            fechas.validate(),
            Err(TorneoError::InvalidField { field: "fecha_fin", .. })
        ));
    }

    #[test]
    fn test_update_refuses_capacity_below_enrolled() {
        let update = TorneoUpdate {
            cupos: Some(Some(1)),
            ..Default::default()
        };
        assert!(matches!(
            update.apply_to(&torneo(Some(4)), 2),
            Err(TorneoError::CapacityBelowEnrolled { cupos: 1, enrolled: 2 })
        ));
        assert_eq!(update.apply_to(&torneo(Some(4)), 1).unwrap().cupos, Some(1));
    }

    #[test]
    fn test_update_double_option_semantics() {
        let clear: TorneoUpdate = serde_json::from_str(r#"{"cupos": null}"#).unwrap();
        assert_eq!(clear.cupos, Some(None));
        assert_eq!(clear.apply_to(&torneo(Some(4)), 3).unwrap().cupos, None);

        let untouched: TorneoUpdate = serde_json::from_str(r#"{"nombre": "Clausura"}"#).unwrap();
        assert_eq!(untouched.cupos, None);
        let updated = untouched.apply_to(&torneo(Some(4)), 3).unwrap();
        assert_eq!(updated.nombre, "Clausura");
        assert_eq!(updated.cupos, Some(4));
    }

    #[test]
    fn test_state_serialization() {
        assert_eq!(
            serde_json::to_string(&TorneoState::InscripcionesAbiertas).unwrap(),
            "\"inscripciones_abiertas\""
        );
        assert_eq!(
            "en_curso".parse::<TorneoState>().unwrap(),
            TorneoState::EnCurso
        );
        assert!(TorneoState::InscripcionesAbiertas.accepts_enrollment());
        assert!(!TorneoState::EnCurso.accepts_enrollment());
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = serde_json::to_value(EnrollOutcome::SinCupo).unwrap();
        assert_eq!(json["resultado"], "sin_cupo");
        let json = serde_json::to_value(AssignOutcome::Rechazado {
            motivo: "ocupado".into(),
        })
        .unwrap();
        assert_eq!(json["resultado"], "rechazado");
        assert_eq!(json["motivo"], "ocupado");
    }
}
