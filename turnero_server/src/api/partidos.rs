//! Match API handlers.
//!
//! A partido may only be scheduled on a turno its tournament has claimed,
//! and only between teams enrolled in that tournament.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use turnero::torneo::{NewPartido, Partido, PartidoFilter, PartidoId, PartidoUpdate, TorneoId};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;

/// Partidos, optionally filtered by `id_torneo` and `id_turno`
pub async fn list_partidos(
    State(state): State<AppState>,
    Query(filter): Query<PartidoFilter>,
) -> ApiResult<Json<Vec<Partido>>> {
    Ok(Json(state.engine.torneos.partidos(&filter).await?))
}

/// Schedule a partido.
///
/// # Errors
///
/// - `400 Bad Request`: Same team twice, foreign winner or negative score
/// - `404 Not Found`: Unknown torneo, turno or team, or a team not enrolled
/// - `409 Conflict`: Turno not claimed by the torneo, or already used by another partido
pub async fn create_partido(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(nuevo): Json<NewPartido>,
) -> ApiResult<(StatusCode, Json<Partido>)> {
    let partido = state.engine.torneos.create_partido(nuevo).await?;
    tracing::info!(
        id_usuario,
        id_partido = partido.id,
        id_torneo = partido.id_torneo,
        "Partido created"
    );
    Ok((StatusCode::CREATED, Json(partido)))
}

pub async fn get_partido(
    State(state): State<AppState>,
    Path(id): Path<PartidoId>,
) -> ApiResult<Json<Partido>> {
    Ok(Json(state.engine.torneos.get_partido(id).await?))
}

/// Merge the given fields; a new turno or team is checked as on creation
pub async fn update_partido(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<PartidoId>,
    Json(update): Json<PartidoUpdate>,
) -> ApiResult<Json<Partido>> {
    Ok(Json(state.engine.torneos.update_partido(id, &update).await?))
}

pub async fn delete_partido(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<PartidoId>,
) -> ApiResult<StatusCode> {
    state.engine.torneos.delete_partido(id).await?;
    tracing::info!(id_usuario, id_partido = id, "Partido deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn partidos_del_torneo(
    State(state): State<AppState>,
    Path(id): Path<TorneoId>,
) -> ApiResult<Json<Vec<Partido>>> {
    Ok(Json(state.engine.torneos.partidos_del_torneo(id).await?))
}
