//! Team and roster API handlers.
//!
//! Membership writes are idempotent: adding a present pair reports
//! `ya_miembro`, removing an absent one reports `no_miembro`.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use turnero::BulkReport;
use turnero::catalog::ClienteId;
use turnero::equipo::{
    Equipo, EquipoId, EquipoMiembro, MemberAddOutcome, MemberRemoveOutcome, NewEquipo,
};

use super::AppState;
use super::error::ApiResult;
use super::middleware::Caller;

#[derive(Debug, Deserialize)]
pub struct MiembrosRequest {
    pub ids_clientes: Vec<ClienteId>,
}

#[derive(Debug, Deserialize)]
pub struct MiembrosQuery {
    pub id_equipo: EquipoId,
}

pub async fn list_equipos(State(state): State<AppState>) -> ApiResult<Json<Vec<Equipo>>> {
    Ok(Json(state.engine.equipos.list().await?))
}

pub async fn get_equipo(
    State(state): State<AppState>,
    Path(id): Path<EquipoId>,
) -> ApiResult<Json<Equipo>> {
    Ok(Json(state.engine.equipos.get(id).await?))
}

/// Create a team; names are unique
pub async fn create_equipo(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(nuevo): Json<NewEquipo>,
) -> ApiResult<(StatusCode, Json<Equipo>)> {
    let equipo = state.engine.equipos.create(nuevo).await?;
    Ok((StatusCode::CREATED, Json(equipo)))
}

pub async fn list_miembros(
    State(state): State<AppState>,
    Path(id): Path<EquipoId>,
) -> ApiResult<Json<Vec<EquipoMiembro>>> {
    Ok(Json(state.engine.equipos.list_miembros(id).await?))
}

/// `GET /equipo_miembros?id_equipo=`
pub async fn query_miembros(
    State(state): State<AppState>,
    Query(query): Query<MiembrosQuery>,
) -> ApiResult<Json<Vec<EquipoMiembro>>> {
    Ok(Json(state.engine.equipos.list_miembros(query.id_equipo).await?))
}

pub async fn add_miembros(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<EquipoId>,
    Json(body): Json<MiembrosRequest>,
) -> ApiResult<Json<BulkReport<ClienteId, MemberAddOutcome>>> {
    Ok(Json(
        state
            .engine
            .equipos
            .add_members(id, &body.ids_clientes)
            .await?,
    ))
}

pub async fn remove_miembros(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(id): Path<EquipoId>,
    Json(body): Json<MiembrosRequest>,
) -> ApiResult<Json<BulkReport<ClienteId, MemberRemoveOutcome>>> {
    Ok(Json(
        state
            .engine
            .equipos
            .remove_members(id, &body.ids_clientes)
            .await?,
    ))
}

/// Single add (`POST /equipo_miembros/`); `201` when the pair is new
pub async fn add_miembro(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(miembro): Json<EquipoMiembro>,
) -> ApiResult<(StatusCode, Json<MemberAddOutcome>)> {
    let outcome = state
        .engine
        .equipos
        .add_member(miembro.id_equipo, miembro.id_cliente)
        .await?;
    let status = match outcome {
        MemberAddOutcome::Agregado => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

pub async fn remove_miembro(
    State(state): State<AppState>,
    Caller(_): Caller,
    Json(miembro): Json<EquipoMiembro>,
) -> ApiResult<Json<MemberRemoveOutcome>> {
    Ok(Json(
        state
            .engine
            .equipos
            .remove_member(miembro.id_equipo, miembro.id_cliente)
            .await?,
    ))
}
