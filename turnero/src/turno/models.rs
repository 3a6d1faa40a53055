//! Turno data models and the pure state-machine rules.
//!
//! Stores call [`Turno::apply`] inside their critical section; the rule itself
//! never touches storage, so both backends share one definition of every
//! guard.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{TurnoError, TurnoResult};
use crate::catalog::{CanchaId, ClienteId, ServicioId, UsuarioId};
use crate::torneo::TorneoId;

/// Turno ID type
pub type TurnoId = i64;

/// Wire prefix reserved for tournament-owned blocks
pub const TORNEO_TAG_PREFIX: &str = "Torneo:";

/// Turno lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnoState {
    Disponible,
    Reservado,
    Bloqueado,
    Cancelado,
    Finalizado,
}

impl TurnoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnoState::Disponible => "disponible",
            TurnoState::Reservado => "reservado",
            TurnoState::Bloqueado => "bloqueado",
            TurnoState::Cancelado => "cancelado",
            TurnoState::Finalizado => "finalizado",
        }
    }

    /// Occupying states take part in overlap exclusivity
    pub fn is_occupying(&self) -> bool {
        matches!(self, TurnoState::Reservado | TurnoState::Bloqueado)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnoState::Cancelado | TurnoState::Finalizado)
    }
}

impl std::fmt::Display for TurnoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TurnoState {
    type Err = TurnoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disponible" => Ok(TurnoState::Disponible),
            "reservado" => Ok(TurnoState::Reservado),
            "bloqueado" => Ok(TurnoState::Bloqueado),
            "cancelado" => Ok(TurnoState::Cancelado),
            "finalizado" => Ok(TurnoState::Finalizado),
            other => Err(TurnoError::InvalidState(other.to_string())),
        }
    }
}

/// Why a turno is blocked.
///
/// Tournament blocks render to the wire as exactly `Torneo:<id>`; any other
/// motive is administrative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    Torneo(TorneoId),
    Admin(String),
}

impl BlockReason {
    /// Classify a wire `motivo_bloqueo`
    pub fn parse(motivo: &str) -> Self {
        match parse_torneo_tag(motivo) {
            Some(id) => BlockReason::Torneo(id),
            None => BlockReason::Admin(motivo.to_string()),
        }
    }

    /// Build an administrative block, refusing motives that would read as a
    /// tournament claim
    pub fn admin(motivo: impl Into<String>) -> TurnoResult<Self> {
        let motivo = motivo.into();
        if motivo.trim().is_empty() {
            return Err(TurnoError::InvalidMotivo(
                "el motivo de bloqueo no puede estar vacío".to_string(),
            ));
        }
        if motivo.starts_with(TORNEO_TAG_PREFIX) {
            return Err(TurnoError::InvalidMotivo(format!(
                "el prefijo '{TORNEO_TAG_PREFIX}' está reservado para torneos"
            )));
        }
        Ok(BlockReason::Admin(motivo))
    }

    pub fn motivo(&self) -> String {
        match self {
            BlockReason::Torneo(id) => torneo_tag(*id),
            BlockReason::Admin(text) => text.clone(),
        }
    }

    pub fn torneo(&self) -> Option<TorneoId> {
        match self {
            BlockReason::Torneo(id) => Some(*id),
            BlockReason::Admin(_) => None,
        }
    }
}

/// Render the canonical tournament tag
pub fn torneo_tag(id: TorneoId) -> String {
    format!("{TORNEO_TAG_PREFIX}{id}")
}

/// Parse `Torneo:<id>` strictly: canonical decimal digits only, so parsing
/// and rendering round-trip bit-for-bit
pub fn parse_torneo_tag(motivo: &str) -> Option<TorneoId> {
    let raw = motivo.strip_prefix(TORNEO_TAG_PREFIX)?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let id: TorneoId = raw.parse().ok()?;
    (id.to_string() == raw).then_some(id)
}

/// Time slot on a court
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turno {
    pub id: TurnoId,
    pub id_cancha: CanchaId,
    /// Inclusive start, facility-local time
    pub fecha_hora_inicio: NaiveDateTime,
    /// Exclusive end, facility-local time
    pub fecha_hora_fin: NaiveDateTime,
    pub estado: TurnoState,
    pub precio_final: i64,
    pub id_cliente: Option<ClienteId>,
    pub id_usuario_registro: Option<UsuarioId>,
    pub reserva_created_at: Option<DateTime<Utc>>,
    pub id_usuario_bloqueo: Option<UsuarioId>,
    pub motivo_bloqueo: Option<String>,
    /// Owning tournament when the block is a tournament claim
    pub id_torneo_bloqueo: Option<TorneoId>,
}

/// A state-changing request against one turno
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// disponible → reservado; stores additionally require a completado pago
    Reserve {
        id_cliente: ClienteId,
        id_usuario_registro: Option<UsuarioId>,
        at: DateTime<Utc>,
    },
    /// disponible → bloqueado
    Block {
        reason: BlockReason,
        id_usuario_bloqueo: Option<UsuarioId>,
    },
    /// bloqueado → disponible. With `owner` set only that torneo's claim may be released.
    Release { owner: Option<TorneoId> },
    /// reservado → cancelado, before the slot ends
    Cancel,
    /// reservado → finalizado, once the slot has ended
    Finish,
}

impl Transition {
    pub fn target(&self) -> TurnoState {
        match self {
            Transition::Reserve { .. } => TurnoState::Reservado,
            Transition::Block { .. } => TurnoState::Bloqueado,
            Transition::Release { .. } => TurnoState::Disponible,
            Transition::Cancel => TurnoState::Cancelado,
            Transition::Finish => TurnoState::Finalizado,
        }
    }
}

/// Result of applying a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// The turno moved; holds the new record
    Applied(Turno),
    /// Idempotent no-op; holds the current record
    Unchanged(Turno),
}

impl Change {
    pub fn turno(&self) -> &Turno {
        match self {
            Change::Applied(t) | Change::Unchanged(t) => t,
        }
    }

    pub fn into_turno(self) -> Turno {
        match self {
            Change::Applied(t) | Change::Unchanged(t) => t,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Change::Applied(_))
    }
}

impl Turno {
    /// Half-open interval intersection: `[a, b)` and `[c, d)` overlap iff `a < d && c < b`
    pub fn overlaps(&self, inicio: NaiveDateTime, fin: NaiveDateTime) -> bool {
        self.fecha_hora_inicio < fin && inicio < self.fecha_hora_fin
    }

    pub fn blocked_by(&self) -> Option<BlockReason> {
        match (self.id_torneo_bloqueo, &self.motivo_bloqueo) {
            (Some(id), _) => Some(BlockReason::Torneo(id)),
            (None, Some(motivo)) => Some(BlockReason::Admin(motivo.clone())),
            (None, None) => None,
        }
    }

    /// Apply a transition against `now` (facility-local clock).
    ///
    /// Overlap exclusivity and the pago requirement depend on other records
    /// and are checked by the store around this call.
    pub fn apply(&self, transition: &Transition, now: NaiveDateTime) -> TurnoResult<Change> {
        let invalid = || TurnoError::InvalidTransition {
            id: self.id,
            from: self.estado,
            to: transition.target(),
        };

        match transition {
            Transition::Reserve {
                id_cliente,
                id_usuario_registro,
                at,
            } => {
                if self.estado != TurnoState::Disponible {
                    return Err(TurnoError::NotAvailable {
                        id: self.id,
                        estado: self.estado,
                    });
                }
                if *id_cliente <= 0 {
                    return Err(TurnoError::ClienteNotFound(*id_cliente));
                }
                let mut next = self.clone();
                next.estado = TurnoState::Reservado;
                next.id_cliente = Some(*id_cliente);
                next.id_usuario_registro = id_usuario_registro.or(self.id_usuario_registro);
                next.reserva_created_at = Some(*at);
                next.clear_block();
                Ok(Change::Applied(next))
            }
            Transition::Block {
                reason,
                id_usuario_bloqueo,
            } => {
                if let BlockReason::Admin(text) = reason {
                    BlockReason::admin(text.clone())?;
                }
                match self.estado {
                    TurnoState::Disponible => {
                        let mut next = self.clone();
                        next.estado = TurnoState::Bloqueado;
                        next.motivo_bloqueo = Some(reason.motivo());
                        next.id_torneo_bloqueo = reason.torneo();
                        next.id_usuario_bloqueo = *id_usuario_bloqueo;
                        Ok(Change::Applied(next))
                    }
                    TurnoState::Bloqueado if self.blocked_by().as_ref() == Some(reason) => {
                        Ok(Change::Unchanged(self.clone()))
                    }
                    TurnoState::Bloqueado => Err(TurnoError::AlreadyBlocked {
                        id: self.id,
                        motivo: self.motivo_bloqueo.clone().unwrap_or_default(),
                    }),
                    TurnoState::Reservado => Err(TurnoError::NotAvailable {
                        id: self.id,
                        estado: self.estado,
                    }),
                    TurnoState::Cancelado | TurnoState::Finalizado => Err(invalid()),
                }
            }
            Transition::Release { owner } => match self.estado {
                TurnoState::Disponible => Ok(Change::Unchanged(self.clone())),
                TurnoState::Bloqueado => {
                    if let Some(id_torneo) = owner {
                        if self.id_torneo_bloqueo != Some(*id_torneo) {
                            return Err(TurnoError::NotOwned {
                                id: self.id,
                                id_torneo: *id_torneo,
                            });
                        }
                    }
                    let mut next = self.clone();
                    next.estado = TurnoState::Disponible;
                    next.clear_block();
                    Ok(Change::Applied(next))
                }
                _ => Err(invalid()),
            },
            Transition::Cancel => {
                if self.estado != TurnoState::Reservado {
                    return Err(invalid());
                }
                if now >= self.fecha_hora_fin {
                    return Err(TurnoError::AlreadyElapsed(self.id));
                }
                let mut next = self.clone();
                next.estado = TurnoState::Cancelado;
                Ok(Change::Applied(next))
            }
            Transition::Finish => {
                if self.estado != TurnoState::Reservado {
                    return Err(invalid());
                }
                if now < self.fecha_hora_fin {
                    return Err(TurnoError::NotYetEnded(self.id));
                }
                let mut next = self.clone();
                next.estado = TurnoState::Finalizado;
                Ok(Change::Applied(next))
            }
        }
    }

    fn clear_block(&mut self) {
        self.motivo_bloqueo = None;
        self.id_torneo_bloqueo = None;
        self.id_usuario_bloqueo = None;
    }
}

/// Request to create a turno
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTurno {
    pub id_cancha: CanchaId,
    pub fecha_hora_inicio: NaiveDateTime,
    pub fecha_hora_fin: NaiveDateTime,
    #[serde(default)]
    pub id_usuario_registro: Option<UsuarioId>,
}

impl NewTurno {
    pub fn new(id_cancha: CanchaId, inicio: NaiveDateTime, fin: NaiveDateTime) -> Self {
        Self {
            id_cancha,
            fecha_hora_inicio: inicio,
            fecha_hora_fin: fin,
            id_usuario_registro: None,
        }
    }

    pub fn validate(&self) -> TurnoResult<()> {
        validate_interval(self.fecha_hora_inicio, self.fecha_hora_fin)
    }
}

pub fn validate_interval(inicio: NaiveDateTime, fin: NaiveDateTime) -> TurnoResult<()> {
    if fin <= inicio {
        return Err(TurnoError::InvalidInterval { inicio, fin });
    }
    Ok(())
}

/// Add-on service attached to a reserved turno, price frozen at booking time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoServicio {
    pub id_turno: TurnoId,
    pub id_servicio: ServicioId,
    pub cantidad: i64,
    pub precio_unitario_congelado: i64,
}

impl TurnoServicio {
    pub fn subtotal(&self) -> Option<i64> {
        self.precio_unitario_congelado.checked_mul(self.cantidad)
    }
}

/// Generic state change, as sent by admin tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoUpdate {
    pub estado: TurnoState,
    #[serde(default)]
    pub motivo_bloqueo: Option<String>,
    #[serde(default)]
    pub id_usuario_bloqueo: Option<UsuarioId>,
    /// Required when moving to `reservado`
    #[serde(default)]
    pub id_cliente: Option<ClienteId>,
    #[serde(default)]
    pub id_usuario_registro: Option<UsuarioId>,
}

impl TurnoUpdate {
    /// Map the requested target state to its transition.
    ///
    /// A `Torneo:<id>` motive becomes a tournament claim; any other motive is
    /// an administrative block.
    pub fn transition(&self, at: DateTime<Utc>) -> TurnoResult<Transition> {
        Ok(match self.estado {
            TurnoState::Disponible => Transition::Release { owner: None },
            TurnoState::Bloqueado => {
                let motivo = self
                    .motivo_bloqueo
                    .as_deref()
                    .ok_or(TurnoError::MissingField("motivo_bloqueo"))?;
                Transition::Block {
                    reason: BlockReason::parse(motivo),
                    id_usuario_bloqueo: self.id_usuario_bloqueo,
                }
            }
            TurnoState::Reservado => Transition::Reserve {
                id_cliente: self
                    .id_cliente
                    .ok_or(TurnoError::MissingField("id_cliente"))?,
                id_usuario_registro: self.id_usuario_registro,
                at,
            },
            TurnoState::Cancelado => Transition::Cancel,
            TurnoState::Finalizado => Transition::Finish,
        })
    }
}

/// Turno with its booked services and full price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnoDetail {
    pub turno: Turno,
    pub servicios: Vec<TurnoServicio>,
    pub precio_total: i64,
}

/// Price breakdown of a turno
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TurnoTotal {
    pub id_turno: TurnoId,
    pub precio_final: i64,
    pub total_servicios: i64,
    pub precio_total: i64,
}

impl TurnoTotal {
    pub fn compute(turno: &Turno, servicios: &[TurnoServicio]) -> TurnoResult<Self> {
        let total_servicios = servicios.iter().try_fold(0i64, |acc, s| {
            s.subtotal()
                .and_then(|sub| acc.checked_add(sub))
                .ok_or(TurnoError::Overflow)
        })?;
        let precio_total = turno
            .precio_final
            .checked_add(total_servicios)
            .ok_or(TurnoError::Overflow)?;
        Ok(Self {
            id_turno: turno.id,
            precio_final: turno.precio_final,
            total_servicios,
            precio_total,
        })
    }
}

/// List filters; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoFilter {
    #[serde(default)]
    pub id_cancha: Option<CanchaId>,
    #[serde(default)]
    pub estado: Option<TurnoState>,
    #[serde(default)]
    pub id_cliente: Option<ClienteId>,
    #[serde(default)]
    pub id_torneo: Option<TorneoId>,
}

impl TurnoFilter {
    pub fn matches(&self, turno: &Turno) -> bool {
        self.id_cancha.is_none_or(|c| turno.id_cancha == c)
            && self.estado.is_none_or(|e| turno.estado == e)
            && self.id_cliente.is_none_or(|c| turno.id_cliente == Some(c))
            && self.id_torneo.is_none_or(|t| turno.id_torneo_bloqueo == Some(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn turno() -> Turno {
        Turno {
            id: 1,
            id_cancha: 1,
            fecha_hora_inicio: at(20, 0),
            fecha_hora_fin: at(21, 0),
            estado: TurnoState::Disponible,
            precio_final: 1300,
            id_cliente: None,
            id_usuario_registro: None,
            reserva_created_at: None,
            id_usuario_bloqueo: None,
            motivo_bloqueo: None,
            id_torneo_bloqueo: None,
        }
    }

    fn reserve() -> Transition {
        Transition::Reserve {
            id_cliente: 9,
            id_usuario_registro: Some(2),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_torneo_tag_round_trip() {
        assert_eq!(torneo_tag(5), "Torneo:5");
        assert_eq!(parse_torneo_tag("Torneo:5"), Some(5));
        assert_eq!(parse_torneo_tag("Torneo:"), None);
        assert_eq!(parse_torneo_tag("Torneo:05"), None);
        assert_eq!(parse_torneo_tag("Torneo:+5"), None);
        assert_eq!(parse_torneo_tag("Torneo:5 "), None);
        assert_eq!(parse_torneo_tag("torneo:5"), None);
        assert_eq!(parse_torneo_tag("Mantenimiento"), None);
    }

    #[test]
    fn test_block_reason_parse() {
        assert_eq!(BlockReason::parse("Torneo:12"), BlockReason::Torneo(12));
        assert_eq!(
            BlockReason::parse("Mantenimiento"),
            BlockReason::Admin("Mantenimiento".into())
        );
        assert!(BlockReason::admin("Torneo:3").is_err());
        assert!(BlockReason::admin("Torneo:abc").is_err());
        assert!(BlockReason::admin("").is_err());
        assert!(BlockReason::admin("Pintura").is_ok());
    }

    #[test]
    fn test_state_round_trip_from_str() {
        for state in [
            TurnoState::Disponible,
            TurnoState::Reservado,
            TurnoState::Bloqueado,
            TurnoState::Cancelado,
            TurnoState::Finalizado,
        ] {
            assert_eq!(state.as_str().parse::<TurnoState>().unwrap(), state);
        }
        assert!("ocupado".parse::<TurnoState>().is_err());
    }

    #[test]
    fn test_overlap_is_half_open() {
        let t = turno();
        assert!(t.overlaps(at(20, 30), at(21, 30)));
        assert!(t.overlaps(at(19, 0), at(22, 0)));
        assert!(!t.overlaps(at(21, 0), at(22, 0)));
        assert!(!t.overlaps(at(19, 0), at(20, 0)));
    }

    #[test]
    fn test_reserve_sets_client_and_rejects_second_reserve() {
        let reserved = turno().apply(&reserve(), at(10, 0)).unwrap().into_turno();
        assert_eq!(reserved.estado, TurnoState::Reservado);
        assert_eq!(reserved.id_cliente, Some(9));
        assert!(reserved.reserva_created_at.is_some());

        let err = reserved.apply(&reserve(), at(10, 0)).unwrap_err();
        assert!(matches!(err, TurnoError::NotAvailable { .. }));
    }

    #[test]
    fn test_block_is_idempotent_for_same_torneo() {
        let block = Transition::Block {
            reason: BlockReason::Torneo(4),
            id_usuario_bloqueo: Some(1),
        };
        let blocked = turno().apply(&block, at(10, 0)).unwrap().into_turno();
        assert_eq!(blocked.motivo_bloqueo.as_deref(), Some("Torneo:4"));
        assert_eq!(blocked.id_torneo_bloqueo, Some(4));

        assert!(matches!(
            blocked.apply(&block, at(10, 0)).unwrap(),
            Change::Unchanged(_)
        ));

        let other = Transition::Block {
            reason: BlockReason::Torneo(5),
            id_usuario_bloqueo: None,
        };
        assert!(matches!(
            blocked.apply(&other, at(10, 0)),
            Err(TurnoError::AlreadyBlocked { .. })
        ));
    }

    #[test]
    fn test_admin_block_with_tag_motive_rejected() {
        let block = Transition::Block {
            reason: BlockReason::Admin("Torneo:4".into()),
            id_usuario_bloqueo: None,
        };
        assert!(matches!(
            turno().apply(&block, at(10, 0)),
            Err(TurnoError::InvalidMotivo(_))
        ));
    }

    #[test]
    fn test_release_twice_is_noop() {
        let block = Transition::Block {
            reason: BlockReason::Admin("Mantenimiento".into()),
            id_usuario_bloqueo: Some(3),
        };
        let blocked = turno().apply(&block, at(10, 0)).unwrap().into_turno();
        let release = Transition::Release { owner: None };

        let released = blocked.apply(&release, at(10, 0)).unwrap();
        assert!(released.is_applied());
        let released = released.into_turno();
        assert_eq!(released.estado, TurnoState::Disponible);
        assert_eq!(released.motivo_bloqueo, None);
        assert_eq!(released.id_usuario_bloqueo, None);

        assert!(!released.apply(&release, at(10, 0)).unwrap().is_applied());
    }

    #[test]
    fn test_owned_release_checks_torneo() {
        let block = Transition::Block {
            reason: BlockReason::Torneo(4),
            id_usuario_bloqueo: None,
        };
        let blocked = turno().apply(&block, at(10, 0)).unwrap().into_turno();

        let foreign = Transition::Release { owner: Some(5) };
        assert!(matches!(
            blocked.apply(&foreign, at(10, 0)),
            Err(TurnoError::NotOwned { id_torneo: 5, .. })
        ));

        let own = Transition::Release { owner: Some(4) };
        assert!(blocked.apply(&own, at(10, 0)).unwrap().is_applied());
    }

    #[test]
    fn test_cancel_allowed_until_end() {
        let reserved = turno().apply(&reserve(), at(10, 0)).unwrap().into_turno();

        let cancelled = reserved.apply(&Transition::Cancel, at(20, 59)).unwrap();
        assert_eq!(cancelled.turno().estado, TurnoState::Cancelado);
        assert_eq!(cancelled.turno().id_cliente, Some(9));

        assert!(matches!(
            reserved.apply(&Transition::Cancel, at(21, 0)),
            Err(TurnoError::AlreadyElapsed(1))
        ));
        assert!(matches!(
            turno().apply(&Transition::Cancel, at(10, 0)),
            Err(TurnoError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_finish_only_after_end() {
        let reserved = turno().apply(&reserve(), at(10, 0)).unwrap().into_turno();
        assert!(matches!(
            reserved.apply(&Transition::Finish, at(20, 30)),
            Err(TurnoError::NotYetEnded(1))
        ));
        let finished = reserved.apply(&Transition::Finish, at(21, 0)).unwrap();
        assert_eq!(finished.turno().estado, TurnoState::Finalizado);

        let terminal = finished.into_turno();
        assert!(terminal.apply(&Transition::Release { owner: None }, at(22, 0)).is_err());
        assert!(terminal.apply(&reserve(), at(22, 0)).is_err());
    }

    #[test]
    fn test_new_turno_rejects_empty_interval() {
        let nuevo = NewTurno {
            id_cancha: 1,
            fecha_hora_inicio: at(10, 0),
            fecha_hora_fin: at(10, 0),
            id_usuario_registro: None,
        };
        assert!(matches!(
            nuevo.validate(),
            Err(TurnoError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_update_maps_to_transition() {
        let update = |estado, motivo: Option<&str>| TurnoUpdate {
            estado,
            motivo_bloqueo: motivo.map(str::to_string),
            id_usuario_bloqueo: None,
            id_cliente: None,
            id_usuario_registro: None,
        };
        let now = Utc::now();
        assert_eq!(
            update(TurnoState::Bloqueado, Some("Torneo:3")).transition(now).unwrap(),
            Transition::Block {
                reason: BlockReason::Torneo(3),
                id_usuario_bloqueo: None
            }
        );
        assert!(matches!(
            update(TurnoState::Bloqueado, None).transition(now),
            Err(TurnoError::MissingField("motivo_bloqueo"))
        ));
        assert!(matches!(
            update(TurnoState::Reservado, None).transition(now),
            Err(TurnoError::MissingField("id_cliente"))
        ));
        assert_eq!(
            update(TurnoState::Disponible, None).transition(now).unwrap(),
            Transition::Release { owner: None }
        );
    }

    #[test]
    fn test_total_adds_frozen_services() {
        let servicios = vec![
            TurnoServicio {
                id_turno: 1,
                id_servicio: 2,
                cantidad: 2,
                precio_unitario_congelado: 150,
            },
            TurnoServicio {
                id_turno: 1,
                id_servicio: 3,
                cantidad: 1,
                precio_unitario_congelado: 400,
            },
        ];
        let total = TurnoTotal::compute(&turno(), &servicios).unwrap();
        assert_eq!(total.total_servicios, 700);
        assert_eq!(total.precio_total, 2000);
    }

    #[test]
    fn test_filter_matches() {
        let t = turno();
        assert!(TurnoFilter::default().matches(&t));
        assert!(TurnoFilter { id_cancha: Some(1), ..Default::default() }.matches(&t));
        assert!(!TurnoFilter { estado: Some(TurnoState::Reservado), ..Default::default() }.matches(&t));
        assert!(!TurnoFilter { id_torneo: Some(1), ..Default::default() }.matches(&t));
    }
}
