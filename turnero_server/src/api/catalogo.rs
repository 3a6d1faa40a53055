//! Catalog API handlers: canchas, tarifas, servicios adicionales, clientes
//! and price quotes.
//!
//! # Examples
//!
//! Quote a night slot:
//! ```bash
//! curl "http://localhost:8080/api/v1/cotizacion?id_cancha=1&inicio=2025-03-10T20:00:00&fin=2025-03-10T21:00:00"
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::NaiveDateTime;
use serde::Deserialize;
use turnero::Quote;
use turnero::catalog::{
    Cancha, CanchaId, Cliente, ClienteId, NewCancha, NewCliente, NewServicio, NewTarifa,
    ServicioAdicional, ServicioId, Tarifa,
};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;

#[derive(Debug, Deserialize)]
pub struct CotizacionQuery {
    pub id_cancha: CanchaId,
    pub inicio: NaiveDateTime,
    pub fin: NaiveDateTime,
}

#[derive(Debug, Default, Deserialize)]
pub struct TarifaQuery {
    #[serde(default)]
    pub id_cancha: Option<CanchaId>,
}

#[derive(Debug, Deserialize)]
pub struct ActivoRequest {
    pub activo: bool,
}

/// Quote a court for an interval.
///
/// Returns the base price, whether the lighting surcharge applies and the
/// resulting `precio_final`. Courts without a tariff quote 0.
///
/// # Errors
///
/// - `400 Bad Request`: `fin <= inicio` or invalid court id
/// - `404 Not Found`: Unknown court
pub async fn cotizar(
    State(state): State<AppState>,
    Query(query): Query<CotizacionQuery>,
) -> ApiResult<Json<Quote>> {
    let quote = state
        .engine
        .tarifas
        .quote(query.id_cancha, query.inicio, query.fin)
        .await?;
    Ok(Json(quote))
}

pub async fn list_canchas(State(state): State<AppState>) -> ApiResult<Json<Vec<Cancha>>> {
    Ok(Json(state.engine.catalog.list_canchas().await?))
}

pub async fn get_cancha(
    State(state): State<AppState>,
    Path(id): Path<CanchaId>,
) -> ApiResult<Json<Cancha>> {
    Ok(Json(state.engine.catalog.get_cancha(id).await?))
}

pub async fn create_cancha(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(nueva): Json<NewCancha>,
) -> ApiResult<(StatusCode, Json<Cancha>)> {
    let cancha = state.engine.catalog.create_cancha(nueva).await?;
    tracing::info!(id_usuario, id_cancha = cancha.id, "Cancha created");
    Ok((StatusCode::CREATED, Json(cancha)))
}

/// Tariff currently applied to a court; `null` when it has none
pub async fn tarifa_de_cancha(
    State(state): State<AppState>,
    Path(id): Path<CanchaId>,
) -> ApiResult<Json<Option<Tarifa>>> {
    state.engine.catalog.get_cancha(id).await?;
    Ok(Json(state.engine.catalog.tarifa_for_cancha(id).await?))
}

pub async fn list_tarifas(
    State(state): State<AppState>,
    Query(query): Query<TarifaQuery>,
) -> ApiResult<Json<Vec<Tarifa>>> {
    let tarifas = state.engine.catalog.list_tarifas().await?;
    Ok(Json(
        tarifas
            .into_iter()
            .filter(|t| query.id_cancha.is_none_or(|c| t.id_cancha == c))
            .collect(),
    ))
}

pub async fn create_tarifa(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(nueva): Json<NewTarifa>,
) -> ApiResult<(StatusCode, Json<Tarifa>)> {
    let tarifa = state.engine.catalog.create_tarifa(nueva).await?;
    tracing::info!(
        id_usuario,
        id_cancha = tarifa.id_cancha,
        precio_hora = tarifa.precio_hora,
        "Tarifa created"
    );
    Ok((StatusCode::CREATED, Json(tarifa)))
}

pub async fn list_servicios(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ServicioAdicional>>> {
    Ok(Json(state.engine.catalog.list_servicios().await?))
}

pub async fn get_servicio(
    State(state): State<AppState>,
    Path(id): Path<ServicioId>,
) -> ApiResult<Json<ServicioAdicional>> {
    Ok(Json(state.engine.catalog.get_servicio(id).await?))
}

pub async fn create_servicio(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(nuevo): Json<NewServicio>,
) -> ApiResult<(StatusCode, Json<ServicioAdicional>)> {
    let servicio = state.engine.catalog.create_servicio(nuevo).await?;
    Ok((StatusCode::CREATED, Json(servicio)))
}

pub async fn set_servicio_activo(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<ServicioId>,
    Json(body): Json<ActivoRequest>,
) -> ApiResult<Json<ServicioAdicional>> {
    Ok(Json(
        state
            .engine
            .catalog
            .set_servicio_activo(id, body.activo)
            .await?,
    ))
}

pub async fn list_clientes(State(state): State<AppState>) -> ApiResult<Json<Vec<Cliente>>> {
    Ok(Json(state.engine.catalog.list_clientes().await?))
}

pub async fn get_cliente(
    State(state): State<AppState>,
    Path(id): Path<ClienteId>,
) -> ApiResult<Json<Cliente>> {
    Ok(Json(state.engine.catalog.get_cliente(id).await?))
}

pub async fn create_cliente(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(nuevo): Json<NewCliente>,
) -> ApiResult<(StatusCode, Json<Cliente>)> {
    let cliente = state.engine.catalog.create_cliente(nuevo).await?;
    Ok((StatusCode::CREATED, Json(cliente)))
}
