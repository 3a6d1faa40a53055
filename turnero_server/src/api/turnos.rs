//! Turno API handlers.
//!
//! This module provides the REST endpoints over the turno state machine:
//! - Listing, availability search and detail views
//! - Generic state updates (`PUT /turnos/{id}`) used by admin tooling
//! - Booking through the booking façade (`POST /turnos/{id}/reservar`)
//! - Cancellation and administrative blocks
//!
//! # Examples
//!
//! Book a turno with one add-on:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/turnos/1/reservar \
//!   -H "X-Usuario-Id: 3" \
//!   -H "Content-Type: application/json" \
//!   -d '{"id_cliente": 7, "metodo_pago": "efectivo", "servicios": [{"id_servicio": 2, "cantidad": 1}]}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use turnero::booking::{Booking, ServiceRequest};
use turnero::catalog::{CanchaId, ClienteId};
use turnero::turno::{
    BlockReason, NewTurno, Turno, TurnoDetail, TurnoFilter, TurnoId, TurnoServicio, TurnoTotal,
    TurnoUpdate,
};
use turnero::{BookingRequest, DomainError};

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::middleware::Caller;
use crate::{logging, metrics};

#[derive(Debug, Deserialize)]
pub struct DisponiblesQuery {
    pub id_cancha: CanchaId,
    pub desde: NaiveDateTime,
    pub hasta: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
pub struct ClienteQuery {
    #[serde(default)]
    pub id_cliente: Option<ClienteId>,
}

#[derive(Debug, Deserialize)]
pub struct ReservarRequest {
    pub id_cliente: ClienteId,
    pub metodo_pago: String,
    #[serde(default)]
    pub id_gateway_externo: Option<String>,
    #[serde(default)]
    pub servicios: Vec<ServiceRequest>,
}

#[derive(Debug, Deserialize)]
pub struct BloquearRequest {
    pub motivo: String,
}

pub async fn list_turnos(
    State(state): State<AppState>,
    Query(filter): Query<TurnoFilter>,
) -> ApiResult<Json<Vec<Turno>>> {
    Ok(Json(state.engine.turnos.list(&filter).await?))
}

/// `disponible` turnos of a court inside `[desde, hasta)`
pub async fn disponibles(
    State(state): State<AppState>,
    Query(query): Query<DisponiblesQuery>,
) -> ApiResult<Json<Vec<Turno>>> {
    let turnos = state
        .engine
        .turnos
        .available(query.id_cancha, query.desde, query.hasta)
        .await?;
    Ok(Json(turnos))
}

pub async fn get_turno(
    State(state): State<AppState>,
    Path(id): Path<TurnoId>,
) -> ApiResult<Json<Turno>> {
    Ok(Json(state.engine.turnos.get(id).await?))
}

/// Turno with its services and total.
///
/// With `?id_cliente=` the turno must be reserved by that client.
///
/// # Errors
///
/// - `403 Forbidden`: The turno is not reserved by `id_cliente`
/// - `404 Not Found`: Unknown turno
pub async fn detalle(
    State(state): State<AppState>,
    Path(id): Path<TurnoId>,
    Query(query): Query<ClienteQuery>,
) -> ApiResult<Json<TurnoDetail>> {
    Ok(Json(state.engine.turnos.detail(id, query.id_cliente).await?))
}

pub async fn servicios(
    State(state): State<AppState>,
    Path(id): Path<TurnoId>,
) -> ApiResult<Json<Vec<TurnoServicio>>> {
    state.engine.turnos.get(id).await?;
    Ok(Json(state.engine.turnos.servicios(id).await?))
}

pub async fn precio_total(
    State(state): State<AppState>,
    Path(id): Path<TurnoId>,
) -> ApiResult<Json<TurnoTotal>> {
    Ok(Json(state.engine.turnos.precio_total(id).await?))
}

pub async fn create_turno(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(mut nuevo): Json<NewTurno>,
) -> ApiResult<(StatusCode, Json<Turno>)> {
    nuevo.id_usuario_registro.get_or_insert(id_usuario);
    let turno = state.engine.turnos.create(nuevo).await?;
    Ok((StatusCode::CREATED, Json(turno)))
}

/// Generic state change.
///
/// A `motivo_bloqueo` of the form `Torneo:<id>` claims the turno for that
/// tournament; any other motive is an administrative block.
///
/// # Errors
///
/// - `400 Bad Request`: Missing `motivo_bloqueo` / `id_cliente` for the target state
/// - `409 Conflict`: Illegal transition or overlap with an occupying turno
pub async fn update_turno(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TurnoId>,
    Json(mut update): Json<TurnoUpdate>,
) -> ApiResult<Json<Turno>> {
    update.id_usuario_bloqueo.get_or_insert(id_usuario);
    update.id_usuario_registro.get_or_insert(id_usuario);
    Ok(Json(state.engine.turnos.update_state(id, &update).await?))
}

pub async fn delete_turno(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TurnoId>,
) -> ApiResult<StatusCode> {
    state.engine.turnos.delete(id).await?;
    tracing::info!(id_usuario, id_turno = id, "Turno deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Book a turno: quote, pay, confirm and reserve in one transaction.
///
/// # Response
///
/// Returns `201 Created` with the reserved turno, the completado pago, the
/// quote and the booked services.
///
/// # Errors
///
/// Every error body carries `paso`, the pipeline step that failed.
/// - `400 Bad Request`: Invalid request or service selection
/// - `404 Not Found`: Unknown turno, client or service
/// - `409 Conflict`: The turno is no longer available
/// - `503 Service Unavailable`: Storage failure; nothing was recorded
pub async fn reservar(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TurnoId>,
    Json(body): Json<ReservarRequest>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    let request = BookingRequest {
        id_turno: id,
        id_cliente: body.id_cliente,
        id_usuario_registro: Some(id_usuario),
        metodo_pago: body.metodo_pago,
        id_gateway_externo: body.id_gateway_externo,
        servicios: body.servicios,
    };

    match state.engine.reservas.book(&request).await {
        Ok(booking) => {
            metrics::bookings_total("confirmada");
            metrics::booking_amount(booking.pago.monto_total);
            metrics::pagos_total("completado");
            logging::log_booking_event(
                "reserva_confirmada",
                id,
                Some(request.id_cliente),
                &format!(
                    "Pago {} completado por {}",
                    booking.pago.id, booking.pago.monto_total
                ),
            );
            Ok((StatusCode::CREATED, Json(booking)))
        }
        Err(err) => {
            metrics::bookings_total(err.step().as_str());
            logging::log_booking_event(
                "reserva_rechazada",
                id,
                Some(request.id_cliente),
                &format!("[{}] {}", err.step(), err.client_message()),
            );
            Err(ApiError::booking(err))
        }
    }
}

/// Cancel a reservation (`reservado -> cancelado`).
///
/// With `?id_cliente=` the reservation must belong to that client.
pub async fn cancelar_reserva(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TurnoId>,
    Query(query): Query<ClienteQuery>,
) -> ApiResult<Json<Turno>> {
    let turno = state.engine.turnos.cancel(id, query.id_cliente).await?;
    logging::log_booking_event(
        "reserva_cancelada",
        id,
        query.id_cliente,
        &format!("Cancelada por usuario {}", id_usuario),
    );
    Ok(Json(turno))
}

/// Administrative block; tournament tags are refused here
pub async fn bloquear(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TurnoId>,
    Json(body): Json<BloquearRequest>,
) -> ApiResult<Json<Turno>> {
    let reason = BlockReason::admin(body.motivo)?;
    Ok(Json(
        state
            .engine
            .turnos
            .block(id, reason, Some(id_usuario))
            .await?,
    ))
}
