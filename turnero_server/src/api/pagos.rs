//! Payment ledger API handlers.
//!
//! Manual payments are recorded as `iniciado`; confirming one that is linked to
//! a turno reserves the turno in the same transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use turnero::pago::{Confirmation, NewPago, Pago, PagoFilter, PagoId};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;
use crate::metrics;

/// List pagos, optionally filtered by `id_cliente`, `id_turno` and `estado`
pub async fn list_pagos(
    State(state): State<AppState>,
    Query(filter): Query<PagoFilter>,
) -> ApiResult<Json<Vec<Pago>>> {
    Ok(Json(state.engine.pagos.list(&filter).await?))
}

pub async fn get_pago(
    State(state): State<AppState>,
    Path(id): Path<PagoId>,
) -> ApiResult<Json<Pago>> {
    Ok(Json(state.engine.pagos.get(id).await?))
}

/// Record a manual payment.
///
/// # Errors
///
/// - `400 Bad Request`: Negative amounts or a `monto_total` that does not add up
/// - `404 Not Found`: Unknown client or turno
/// - `409 Conflict`: The turno already has a completado pago
pub async fn create_manual(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(mut nuevo): Json<NewPago>,
) -> ApiResult<(StatusCode, Json<Pago>)> {
    nuevo.id_usuario_registro.get_or_insert(id_usuario);
    let pago = state.engine.pagos.create(nuevo).await?;
    metrics::pagos_total("iniciado");
    Ok((StatusCode::CREATED, Json(pago)))
}

/// Confirm an `iniciado` pago.
///
/// # Errors
///
/// - `409 Conflict`: Already processed, expired, or the linked turno could not
///   be reserved (the pago stays `iniciado`)
pub async fn confirmar(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<PagoId>,
    Json(confirmation): Json<Confirmation>,
) -> ApiResult<Json<Pago>> {
    let pago = state.engine.pagos.confirm(id, &confirmation).await?;
    metrics::pagos_total("completado");
    Ok(Json(pago))
}

pub async fn marcar_fallido(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<PagoId>,
) -> ApiResult<Json<Pago>> {
    let pago = state.engine.pagos.mark_failed(id).await?;
    metrics::pagos_total("fallido");
    Ok(Json(pago))
}

/// Delete a pago; rejected while it backs a live reservation
pub async fn delete_pago(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<PagoId>,
) -> ApiResult<StatusCode> {
    state.engine.pagos.delete(id).await?;
    tracing::info!(id_usuario, id_pago = id, "Pago deleted");
    Ok(StatusCode::NO_CONTENT)
}
