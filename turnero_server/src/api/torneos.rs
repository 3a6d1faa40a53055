//! Tournament API handlers: tournaments, their turno claims and team
//! enrollment (`equipo-torneo`).
//!
//! Bulk endpoints always answer `200 OK` with a per-item report once the
//! tournament itself is found; individual rejections are not request errors.
//!
//! # Examples
//!
//! Claim three turnos for tournament 4:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/torneos/4/turnos \
//!   -H "X-Usuario-Id: 1" \
//!   -H "Content-Type: application/json" \
//!   -d '{"ids_turnos": [10, 11, 12]}'
//! ```

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use turnero::BulkReport;
use turnero::equipo::EquipoId;
use turnero::torneo::{
    AssignOutcome, EnrollOutcome, Inscripcion, InscripcionFilter, InscripcionKey, NewTorneo,
    ReleaseOutcome, Torneo, TorneoId, TorneoRemoval, TorneoState, TorneoUpdate,
    WithdrawOutcome,
};
use turnero::turno::{Turno, TurnoId};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;

#[derive(Debug, Default, Deserialize)]
pub struct EstadoQuery {
    #[serde(default)]
    pub estado: Option<TorneoState>,
}

#[derive(Debug, Deserialize)]
pub struct TurnosRequest {
    pub ids_turnos: Vec<TurnoId>,
}

#[derive(Debug, Deserialize)]
pub struct InscribirMasivoRequest {
    pub id_torneo: TorneoId,
    pub ids_equipos: Vec<EquipoId>,
}

#[derive(Debug, Deserialize)]
pub struct DesinscribirMasivoRequest {
    pub inscripciones: Vec<InscripcionKey>,
}

#[derive(Debug, Serialize)]
pub struct CuposResponse {
    pub id_torneo: TorneoId,
    pub cupos: Option<i32>,
    pub inscritos: i64,
    /// `null` when the tournament has no capacity limit
    pub restantes: Option<i64>,
}

pub async fn list_torneos(
    State(state): State<AppState>,
    Query(query): Query<EstadoQuery>,
) -> ApiResult<Json<Vec<Torneo>>> {
    Ok(Json(state.engine.torneos.list(query.estado).await?))
}

pub async fn get_torneo(
    State(state): State<AppState>,
    Path(id): Path<TorneoId>,
) -> ApiResult<Json<Torneo>> {
    Ok(Json(state.engine.torneos.get(id).await?))
}

pub async fn create_torneo(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Json(nuevo): Json<NewTorneo>,
) -> ApiResult<(StatusCode, Json<Torneo>)> {
    let torneo = state.engine.torneos.create(nuevo).await?;
    tracing::info!(id_usuario, id_torneo = torneo.id, "Torneo created");
    Ok((StatusCode::CREATED, Json(torneo)))
}

/// Partial update.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid fields
/// - `409 Conflict`: `cupos` below the current enrollment
pub async fn update_torneo(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<TorneoId>,
    Json(update): Json<TorneoUpdate>,
) -> ApiResult<Json<Torneo>> {
    Ok(Json(state.engine.torneos.update(id, &update).await?))
}

/// Delete a tournament, releasing its claimed turnos and dropping its
/// partidos and enrollments
pub async fn delete_torneo(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TorneoId>,
) -> ApiResult<Json<TorneoRemoval>> {
    let removal = state.engine.torneos.delete(id).await?;
    tracing::info!(
        id_usuario,
        id_torneo = id,
        turnos_liberados = removal.turnos_liberados.len(),
        partidos_eliminados = removal.partidos_eliminados,
        "Torneo deleted"
    );
    Ok(Json(removal))
}

pub async fn turnos_del_torneo(
    State(state): State<AppState>,
    Path(id): Path<TorneoId>,
) -> ApiResult<Json<Vec<Turno>>> {
    Ok(Json(state.engine.torneos.turnos_del_torneo(id).await?))
}

pub async fn assign_turnos(
    State(state): State<AppState>,
    Caller(id_usuario): Caller,
    Path(id): Path<TorneoId>,
    Json(body): Json<TurnosRequest>,
) -> ApiResult<Json<BulkReport<TurnoId, AssignOutcome>>> {
    Ok(Json(
        state
            .engine
            .torneos
            .assign_turnos(id, &body.ids_turnos, Some(id_usuario))
            .await?,
    ))
}

/// Release turnos claimed by this tournament; foreign claims are rejected per item
pub async fn release_turnos(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<TorneoId>,
    Json(body): Json<TurnosRequest>,
) -> ApiResult<Json<BulkReport<TurnoId, ReleaseOutcome>>> {
    Ok(Json(
        state
            .engine
            .torneos
            .release_turnos(id, &body.ids_turnos)
            .await?,
    ))
}

pub async fn cupos(
    State(state): State<AppState>,
    Path(id): Path<TorneoId>,
) -> ApiResult<Json<CuposResponse>> {
    let torneo = state.engine.torneos.get(id).await?;
    let inscritos = state.engine.torneos.enrolled_count(id).await?;
    let restantes = state.engine.torneos.remaining_slots(id).await?;
    Ok(Json(CuposResponse {
        id_torneo: id,
        cupos: torneo.cupos,
        inscritos,
        restantes,
    }))
}

/// Enrollments, optionally filtered by `id_torneo` and `id_equipo`
pub async fn list_inscripciones(
    State(state): State<AppState>,
    Query(filter): Query<InscripcionFilter>,
) -> ApiResult<Json<Vec<Inscripcion>>> {
    Ok(Json(state.engine.torneos.inscripciones(&filter).await?))
}

pub async fn inscribir(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(key): Json<InscripcionKey>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .torneos
        .enroll(key.id_torneo, key.id_equipo)
        .await?;
    Ok(StatusCode::CREATED)
}

pub async fn desinscribir(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(key): Json<InscripcionKey>,
) -> ApiResult<StatusCode> {
    state
        .engine
        .torneos
        .withdraw(key.id_torneo, key.id_equipo)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Enroll several teams; each reports `inscrito`, `ya_inscrito`, `sin_cupo`
/// or `no_encontrado`
pub async fn inscribir_masivo(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(body): Json<InscribirMasivoRequest>,
) -> ApiResult<Json<BulkReport<EquipoId, EnrollOutcome>>> {
    Ok(Json(
        state
            .engine
            .torneos
            .enroll_teams(body.id_torneo, &body.ids_equipos)
            .await?,
    ))
}

/// Withdraw (equipo, torneo) pairs; each reports `retirado` or `no_inscrito`
pub async fn desinscribir_masivo(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(body): Json<DesinscribirMasivoRequest>,
) -> Json<BulkReport<InscripcionKey, WithdrawOutcome>> {
    Json(state.engine.torneos.withdraw_teams(&body.inscripciones).await)
}
