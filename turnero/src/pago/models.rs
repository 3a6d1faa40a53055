//! Payment data models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{PagoError, PagoResult};
use crate::catalog::{ClienteId, UsuarioId};
use crate::db::config::parse_env_or;
use crate::turno::TurnoId;

/// Pago ID type
pub type PagoId = i64;

/// Default lifetime of an `iniciado` pago
pub const DEFAULT_EXPIRATION_MINUTES: i64 = 30;

/// Payment state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PagoState {
    Iniciado,
    Completado,
    Fallido,
}

impl PagoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PagoState::Iniciado => "iniciado",
            PagoState::Completado => "completado",
            PagoState::Fallido => "fallido",
        }
    }
}

impl std::fmt::Display for PagoState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PagoState {
    type Err = PagoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iniciado" => Ok(PagoState::Iniciado),
            "completado" => Ok(PagoState::Completado),
            "fallido" => Ok(PagoState::Fallido),
            other => Err(PagoError::InvalidState(other.to_string())),
        }
    }
}

/// Payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pago {
    pub id: PagoId,
    pub id_turno: Option<TurnoId>,
    pub monto_turno: i64,
    pub monto_servicios: i64,
    pub monto_total: i64,
    pub id_cliente: ClienteId,
    pub id_usuario_registro: Option<UsuarioId>,
    pub estado: PagoState,
    pub metodo_pago: Option<String>,
    pub id_gateway_externo: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    pub fecha_expiracion: Option<DateTime<Utc>>,
    pub fecha_completado: Option<DateTime<Utc>>,
}

impl Pago {
    pub fn amounts_consistent(&self) -> bool {
        self.monto_turno.checked_add(self.monto_servicios) == Some(self.monto_total)
    }

    /// An `iniciado` pago past its expiration can no longer be confirmed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.estado == PagoState::Iniciado && self.fecha_expiracion.is_some_and(|e| now >= e)
    }

    /// Move to `completado`, checking the confirm guards.
    ///
    /// Amounts are verified, never recomputed.
    pub fn confirmed(&self, confirmation: &Confirmation, now: DateTime<Utc>) -> PagoResult<Pago> {
        if self.estado != PagoState::Iniciado {
            return Err(PagoError::AlreadyProcessed {
                id: self.id,
                estado: self.estado,
            });
        }
        if self.is_expired(now) {
            return Err(PagoError::Expired(self.id));
        }
        if !self.amounts_consistent() {
            return Err(PagoError::AmountMismatch {
                monto_turno: self.monto_turno,
                monto_servicios: self.monto_servicios,
                monto_total: self.monto_total,
            });
        }
        let mut next = self.clone();
        next.estado = PagoState::Completado;
        next.fecha_completado = Some(now);
        if let Some(metodo) = &confirmation.metodo_pago {
            next.metodo_pago = Some(metodo.clone());
        }
        if let Some(gateway) = &confirmation.id_gateway_externo {
            next.id_gateway_externo = Some(gateway.clone());
        }
        Ok(next)
    }

    /// Move to `fallido` (terminal)
    pub fn failed(&self) -> PagoResult<Pago> {
        if self.estado != PagoState::Iniciado {
            return Err(PagoError::AlreadyProcessed {
                id: self.id,
                estado: self.estado,
            });
        }
        let mut next = self.clone();
        next.estado = PagoState::Fallido;
        Ok(next)
    }
}

/// Request to create a pago
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPago {
    #[serde(default)]
    pub id_turno: Option<TurnoId>,
    pub monto_turno: i64,
    #[serde(default)]
    pub monto_servicios: i64,
    /// When supplied it must equal `monto_turno + monto_servicios`
    #[serde(default)]
    pub monto_total: Option<i64>,
    pub id_cliente: ClienteId,
    #[serde(default)]
    pub id_usuario_registro: Option<UsuarioId>,
    #[serde(default)]
    pub metodo_pago: Option<String>,
}

impl NewPago {
    /// Validate the amounts and return the total to store
    pub fn total(&self) -> PagoResult<i64> {
        for amount in [self.monto_turno, self.monto_servicios] {
            if amount < 0 {
                return Err(PagoError::InvalidAmount(amount));
            }
        }
        let total = self
            .monto_turno
            .checked_add(self.monto_servicios)
            .ok_or(PagoError::Overflow)?;
        if let Some(declared) = self.monto_total {
            if declared != total {
                return Err(PagoError::AmountMismatch {
                    monto_turno: self.monto_turno,
                    monto_servicios: self.monto_servicios,
                    monto_total: declared,
                });
            }
        }
        Ok(total)
    }
}

/// External confirmation details stamped on the pago
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub metodo_pago: Option<String>,
    #[serde(default)]
    pub id_gateway_externo: Option<String>,
}

/// List filters; unset fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagoFilter {
    #[serde(default)]
    pub id_cliente: Option<ClienteId>,
    #[serde(default)]
    pub id_turno: Option<TurnoId>,
    #[serde(default)]
    pub estado: Option<PagoState>,
}

impl PagoFilter {
    pub fn matches(&self, pago: &Pago) -> bool {
        self.id_cliente.is_none_or(|c| pago.id_cliente == c)
            && self.id_turno.is_none_or(|t| pago.id_turno == Some(t))
            && self.estado.is_none_or(|e| pago.estado == e)
    }
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Lifetime of an `iniciado` pago; `None` disables expiry
    pub expiration: Option<Duration>,
}

impl LedgerConfig {
    /// Load from `PAGO_EXPIRATION_MINUTES` (default 30, `0` disables expiry)
    pub fn from_env() -> Self {
        Self::with_minutes(parse_env_or(
            "PAGO_EXPIRATION_MINUTES",
            DEFAULT_EXPIRATION_MINUTES,
        ))
    }

    pub fn with_minutes(minutes: i64) -> Self {
        Self {
            expiration: (minutes > 0).then(|| Duration::minutes(minutes)),
        }
    }

    pub fn expires_at(&self, created: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expiration.map(|d| created + d)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::with_minutes(DEFAULT_EXPIRATION_MINUTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pago() -> Pago {
        let now = Utc::now();
        Pago {
            id: 1,
            id_turno: Some(3),
            monto_turno: 1000,
            monto_servicios: 300,
            monto_total: 1300,
            id_cliente: 7,
            id_usuario_registro: None,
            estado: PagoState::Iniciado,
            metodo_pago: Some("efectivo".into()),
            id_gateway_externo: None,
            fecha_creacion: now,
            fecha_expiracion: Some(now + Duration::minutes(30)),
            fecha_completado: None,
        }
    }

    fn nuevo(monto_turno: i64, monto_servicios: i64, monto_total: Option<i64>) -> NewPago {
        NewPago {
            id_turno: None,
            monto_turno,
            monto_servicios,
            monto_total,
            id_cliente: 1,
            id_usuario_registro: None,
            metodo_pago: None,
        }
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        assert_eq!(nuevo(1000, 250, None).total().unwrap(), 1250);
        assert_eq!(nuevo(1000, 250, Some(1250)).total().unwrap(), 1250);
        assert!(matches!(
            nuevo(1000, 250, Some(1300)).total(),
            Err(PagoError::AmountMismatch { .. })
        ));
        assert!(matches!(
            nuevo(-1, 0, None).total(),
            Err(PagoError::InvalidAmount(-1))
        ));
        assert!(matches!(
            nuevo(i64::MAX, 1, None).total(),
            Err(PagoError::Overflow)
        ));
    }

    #[test]
    fn test_confirm_stamps_gateway_and_rejects_reconfirm() {
        let confirmation = Confirmation {
            metodo_pago: Some("tarjeta".into()),
            id_gateway_externo: Some("mp-123".into()),
        };
        let done = pago().confirmed(&confirmation, Utc::now()).unwrap();
        assert_eq!(done.estado, PagoState::Completado);
        assert_eq!(done.metodo_pago.as_deref(), Some("tarjeta"));
        assert_eq!(done.id_gateway_externo.as_deref(), Some("mp-123"));
        assert!(done.fecha_completado.is_some());

        assert!(matches!(
            done.confirmed(&confirmation, Utc::now()),
            Err(PagoError::AlreadyProcessed { estado: PagoState::Completado, .. })
        ));
        assert!(done.failed().is_err());
    }

    #[test]
    fn test_expired_pago_cannot_be_confirmed() {
        let p = pago();
        let later = p.fecha_creacion + Duration::minutes(31);
        assert!(p.is_expired(later));
        assert!(matches!(
            p.confirmed(&Confirmation::default(), later),
            Err(PagoError::Expired(1))
        ));
        assert_eq!(p.failed().unwrap().estado, PagoState::Fallido);
    }

    #[test]
    fn test_inconsistent_amounts_rejected_at_confirm() {
        let mut p = pago();
        p.monto_total = 999;
        assert!(matches!(
            p.confirmed(&Confirmation::default(), Utc::now()),
            Err(PagoError::AmountMismatch { .. })
        ));
    }

    #[test]
    fn test_ledger_config_expiry() {
        let created = Utc::now();
        assert_eq!(
            LedgerConfig::default().expires_at(created),
            Some(created + Duration::minutes(30))
        );
        assert_eq!(LedgerConfig::with_minutes(0).expires_at(created), None);
    }
}
