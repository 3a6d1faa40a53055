//! HTTP API for the booking engine.
//!
//! # Architecture
//!
//! The API is built with:
//! - **Axum**: Async web framework
//! - **Tower**: Middleware for CORS, request ids, caller identity and metrics
//! - **Engine**: Every handler goes through the [`turnero::Engine`] components;
//!   none writes turno state directly
//!
//! # Modules
//!
//! - [`catalogo`]: Courts, tariffs, add-on services, clients and quotes
//! - [`turnos`]: Turno listing, state updates, booking and cancellation
//! - [`pagos`]: Payment ledger
//! - [`torneos`]: Tournaments, turno claims and team enrollment
//! - [`partidos`]: Tournament matches on claimed turnos
//! - [`equipos`]: Teams and rosters
//! - [`middleware`]: Caller identity and request tracking
//! - [`error`]: Error kind to status mapping
//!
//! # Caller identity
//!
//! Every state-changing request must carry `X-Usuario-Id: <id>`; a missing
//! or invalid header is answered with `401 Unauthorized`. Reads are public.
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod catalogo;
pub mod equipos;
pub mod error;
pub mod middleware;
pub mod pagos;
pub mod partidos;
pub mod request_id;
pub mod torneos;
pub mod turnos;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post, put},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use turnero::Engine;

use crate::metrics;

/// Application state shared across all HTTP handlers.
///
/// Cloned for each request; the engine components share one store behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
}

impl AppState {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Endpoint Summary
///
/// ```text
/// GET    /health
/// GET    /api/v1/cotizacion?id_cancha&inicio&fin
/// GET    /api/v1/canchas                     POST (create)
/// GET    /api/v1/canchas/{id}
/// GET    /api/v1/canchas/{id}/tarifa
/// GET    /api/v1/tarifas?id_cancha           POST (create)
/// GET    /api/v1/servicios                   POST (create)
/// GET    /api/v1/servicios/{id}
/// PUT    /api/v1/servicios/{id}/activo
/// GET    /api/v1/clientes                    POST (create)
/// GET    /api/v1/clientes/{id}
/// GET    /api/v1/turnos?id_cancha&estado&id_cliente&id_torneo   POST (create)
/// GET    /api/v1/turnos/disponibles?id_cancha&desde&hasta
/// GET    /api/v1/turnos/{id}                 PUT (state update), DELETE
/// GET    /api/v1/turnos/{id}/detalle?id_cliente
/// GET    /api/v1/turnos/{id}/servicios
/// GET    /api/v1/turnos/{id}/precio-total
/// POST   /api/v1/turnos/{id}/reservar
/// POST   /api/v1/turnos/{id}/cancelar-reserva?id_cliente
/// POST   /api/v1/turnos/{id}/bloquear
/// GET    /api/v1/pagos?id_cliente&id_turno&estado
/// POST   /api/v1/pagos/manual
/// GET    /api/v1/pagos/{id}                  DELETE
/// POST   /api/v1/pagos/{id}/confirmar
/// POST   /api/v1/pagos/{id}/marcar-fallido
/// GET    /api/v1/torneos?estado              POST (create)
/// GET    /api/v1/torneos/{id}                PUT, DELETE (cascade)
/// GET    /api/v1/torneos/{id}/turnos         POST (assign), DELETE (release)
/// GET    /api/v1/torneos/{id}/cupos
/// GET    /api/v1/torneos/{id}/partidos
/// GET    /api/v1/partidos?id_torneo&id_turno POST (create)
/// GET    /api/v1/partidos/{id}               PUT, DELETE
/// GET    /api/v1/equipo-torneo?id_torneo&id_equipo   POST (enroll), DELETE (withdraw)
/// POST   /api/v1/equipo-torneo/inscribir-masivo
/// DELETE /api/v1/equipo-torneo/desinscribir-masivo
/// GET    /api/v1/equipos                     POST (create)
/// GET    /api/v1/equipos/{id}
/// GET    /api/v1/equipos/{id}/miembros       POST (bulk add), DELETE (bulk remove)
/// GET    /api/v1/equipo_miembros?id_equipo   POST (single add), DELETE (single remove)
/// ```
///
/// # Example
///
/// ```rust,no_run
/// # use turnero_server::api::{create_router, AppState};
/// # use turnero::{Engine, EngineConfig};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let state = AppState::new(Engine::in_memory(EngineConfig::default()));
/// let app = create_router(state);
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router())
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Versioned endpoints; state-changing routes are guarded by the caller middleware
fn create_v1_router() -> Router<AppState> {
    let catalogo_routes = Router::new()
        .route("/cotizacion", get(catalogo::cotizar))
        .route(
            "/canchas",
            get(catalogo::list_canchas).post(catalogo::create_cancha),
        )
        .route("/canchas/{id}", get(catalogo::get_cancha))
        .route("/canchas/{id}/tarifa", get(catalogo::tarifa_de_cancha))
        .route(
            "/tarifas",
            get(catalogo::list_tarifas).post(catalogo::create_tarifa),
        )
        .route(
            "/servicios",
            get(catalogo::list_servicios).post(catalogo::create_servicio),
        )
        .route("/servicios/{id}", get(catalogo::get_servicio))
        .route("/servicios/{id}/activo", put(catalogo::set_servicio_activo))
        .route(
            "/clientes",
            get(catalogo::list_clientes).post(catalogo::create_cliente),
        )
        .route("/clientes/{id}", get(catalogo::get_cliente));

    let turno_routes = Router::new()
        .route("/turnos", get(turnos::list_turnos).post(turnos::create_turno))
        .route("/turnos/disponibles", get(turnos::disponibles))
        .route(
            "/turnos/{id}",
            get(turnos::get_turno)
                .put(turnos::update_turno)
                .delete(turnos::delete_turno),
        )
        .route("/turnos/{id}/detalle", get(turnos::detalle))
        .route("/turnos/{id}/servicios", get(turnos::servicios))
        .route("/turnos/{id}/precio-total", get(turnos::precio_total))
        .route("/turnos/{id}/reservar", post(turnos::reservar))
        .route("/turnos/{id}/cancelar-reserva", post(turnos::cancelar_reserva))
        .route("/turnos/{id}/bloquear", post(turnos::bloquear));

    let pago_routes = Router::new()
        .route("/pagos", get(pagos::list_pagos))
        .route("/pagos/manual", post(pagos::create_manual))
        .route(
            "/pagos/{id}",
            get(pagos::get_pago).delete(pagos::delete_pago),
        )
        .route("/pagos/{id}/confirmar", post(pagos::confirmar))
        .route("/pagos/{id}/marcar-fallido", post(pagos::marcar_fallido));

    let torneo_routes = Router::new()
        .route(
            "/torneos",
            get(torneos::list_torneos).post(torneos::create_torneo),
        )
        .route(
            "/torneos/{id}",
            get(torneos::get_torneo)
                .put(torneos::update_torneo)
                .delete(torneos::delete_torneo),
        )
        .route(
            "/torneos/{id}/turnos",
            get(torneos::turnos_del_torneo)
                .post(torneos::assign_turnos)
                .delete(torneos::release_turnos),
        )
        .route("/torneos/{id}/cupos", get(torneos::cupos))
        .route("/torneos/{id}/partidos", get(partidos::partidos_del_torneo))
        .route(
            "/equipo-torneo",
            get(torneos::list_inscripciones)
                .post(torneos::inscribir)
                .delete(torneos::desinscribir),
        )
        .route(
            "/equipo-torneo/inscribir-masivo",
            post(torneos::inscribir_masivo),
        )
        .route(
            "/equipo-torneo/desinscribir-masivo",
            axum::routing::delete(torneos::desinscribir_masivo),
        );

    let partido_routes = Router::new()
        .route(
            "/partidos",
            get(partidos::list_partidos).post(partidos::create_partido),
        )
        .route(
            "/partidos/",
            get(partidos::list_partidos).post(partidos::create_partido),
        )
        .route(
            "/partidos/{id}",
            get(partidos::get_partido)
                .put(partidos::update_partido)
                .delete(partidos::delete_partido),
        );

    let equipo_routes = Router::new()
        .route(
            "/equipos",
            get(equipos::list_equipos).post(equipos::create_equipo),
        )
        .route("/equipos/{id}", get(equipos::get_equipo))
        .route(
            "/equipos/{id}/miembros",
            get(equipos::list_miembros)
                .post(equipos::add_miembros)
                .delete(equipos::remove_miembros),
        )
        .route(
            "/equipo_miembros",
            get(equipos::query_miembros)
                .post(equipos::add_miembro)
                .delete(equipos::remove_miembro),
        )
        .route(
            "/equipo_miembros/",
            post(equipos::add_miembro).delete(equipos::remove_miembro),
        );

    Router::new()
        .merge(catalogo_routes)
        .merge(turno_routes)
        .merge(pago_routes)
        .merge(torneo_routes)
        .merge(partido_routes)
        .merge(equipo_routes)
        .route_layer(axum::middleware::from_fn(middleware::caller_middleware))
        .route_layer(axum::middleware::from_fn(middleware::track_requests))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the storage backend answers, `503 Service Unavailable`
/// otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","storage":{"backend":"postgres","healthy":true},...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = state.engine.health_check().await;
    metrics::storage_healthy(storage_healthy);

    let status_code = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if storage_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "storage": {
            "backend": state.engine.backend(),
            "healthy": storage_healthy,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
