//! Pricing data models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::catalog::{CanchaId, ServicioId, TarifaId};

/// Price quote for a court and interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub id_cancha: CanchaId,
    pub fecha_hora_inicio: NaiveDateTime,
    pub fecha_hora_fin: NaiveDateTime,
    pub duracion_minutos: i64,
    /// Tariff used; `None` means the silent-zero fallback applied
    pub id_tarifa: Option<TarifaId>,
    pub precio_hora: i64,
    pub precio_base: i64,
    pub luz_aplicada: bool,
    pub id_servicio_luz: Option<ServicioId>,
    pub luz_monto: i64,
    pub precio_final: i64,
}
