//! Booking request and result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{ClienteId, ServicioId, UsuarioId};
use crate::pago::{Confirmation, NewPago, Pago};
use crate::pricing::Quote;
use crate::turno::{Turno, TurnoId, TurnoServicio};

/// Step of the booking pipeline, reported with every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStep {
    Validacion,
    Cotizacion,
    Pago,
    Confirmacion,
    Reserva,
    Servicios,
    /// Commit or the overall deadline; the outcome may be unknown
    Transaccion,
}

impl BookingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStep::Validacion => "validacion",
            BookingStep::Cotizacion => "cotizacion",
            BookingStep::Pago => "pago",
            BookingStep::Confirmacion => "confirmacion",
            BookingStep::Reserva => "reserva",
            BookingStep::Servicios => "servicios",
            BookingStep::Transaccion => "transaccion",
        }
    }
}

impl std::fmt::Display for BookingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Add-on requested with a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id_servicio: ServicioId,
    #[serde(default = "default_quantity")]
    pub cantidad: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Client-facing booking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id_turno: TurnoId,
    pub id_cliente: ClienteId,
    #[serde(default)]
    pub id_usuario_registro: Option<UsuarioId>,
    pub metodo_pago: String,
    #[serde(default)]
    pub id_gateway_externo: Option<String>,
    #[serde(default)]
    pub servicios: Vec<ServiceRequest>,
}

/// Fully priced booking handed to the store for one atomic write
#[derive(Debug, Clone)]
pub struct BookingOrder {
    pub id_turno: TurnoId,
    pub id_cliente: ClienteId,
    pub id_usuario_registro: Option<UsuarioId>,
    pub quote: Quote,
    pub pago: NewPago,
    pub expires_at: Option<DateTime<Utc>>,
    pub confirmation: Confirmation,
    pub servicios: Vec<TurnoServicio>,
    pub at: DateTime<Utc>,
}

/// Records written by a successful booking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookedRecords {
    pub turno: Turno,
    pub pago: Pago,
    pub servicios: Vec<TurnoServicio>,
}

/// Confirmed reservation returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Booking {
    pub turno: Turno,
    pub pago: Pago,
    pub cotizacion: Quote,
    pub servicios: Vec<TurnoServicio>,
}
