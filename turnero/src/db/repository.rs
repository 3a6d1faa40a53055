//! Repository trait definitions for testability and dependency injection.
//!
//! Managers depend on these traits only. [`PgStore`](super::PgStore) is the
//! production backend and [`MemoryStore`](super::MemoryStore) backs tests and
//! local runs; both implement the same guards inside one critical section per
//! call.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::booking::{BookedRecords, BookingOrder, BookingResult};
use crate::catalog::{
    Cancha, CanchaId, CatalogResult, Cliente, ClienteId, NewCancha, NewCliente, NewServicio,
    NewTarifa, ServicioAdicional, ServicioId, Tarifa,
};
use crate::equipo::{
    Equipo, EquipoId, EquipoMiembro, EquipoResult, MemberAddOutcome, MemberRemoveOutcome,
    NewEquipo,
};
use crate::pago::{Confirmation, NewPago, Pago, PagoFilter, PagoId, PagoResult};
use crate::torneo::{
    EnrollOutcome, Inscripcion, InscripcionFilter, NewPartido, NewTorneo, Partido, PartidoFilter,
    PartidoId, PartidoUpdate, Torneo, TorneoId, TorneoRemoval, TorneoResult, TorneoState,
    TorneoUpdate, WithdrawOutcome,
};
use crate::turno::{
    Change, NewTurno, Transition, Turno, TurnoFilter, TurnoId, TurnoResult, TurnoServicio,
};

/// Trait for court, tariff, service and client records
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_cancha(&self, nueva: &NewCancha) -> CatalogResult<Cancha>;

    async fn get_cancha(&self, id: CanchaId) -> CatalogResult<Option<Cancha>>;

    async fn list_canchas(&self) -> CatalogResult<Vec<Cancha>>;

    /// Create a tariff; fails with `CanchaNotFound` for unknown courts
    async fn create_tarifa(&self, nueva: &NewTarifa) -> CatalogResult<Tarifa>;

    /// Tariff consulted at booking time: the most recently created one
    async fn tarifa_for_cancha(&self, id_cancha: CanchaId) -> CatalogResult<Option<Tarifa>>;

    async fn list_tarifas(&self) -> CatalogResult<Vec<Tarifa>>;

    async fn create_servicio(&self, nuevo: &NewServicio) -> CatalogResult<ServicioAdicional>;

    async fn get_servicio(&self, id: ServicioId) -> CatalogResult<Option<ServicioAdicional>>;

    async fn list_servicios(&self) -> CatalogResult<Vec<ServicioAdicional>>;

    async fn set_servicio_activo(
        &self,
        id: ServicioId,
        activo: bool,
    ) -> CatalogResult<ServicioAdicional>;

    async fn create_cliente(&self, nuevo: &NewCliente) -> CatalogResult<Cliente>;

    async fn get_cliente(&self, id: ClienteId) -> CatalogResult<Option<Cliente>>;

    async fn list_clientes(&self) -> CatalogResult<Vec<Cliente>>;
}

/// Trait for turno records and their guarded state transitions
#[async_trait]
pub trait TurnoRepository: Send + Sync {
    /// Insert a `disponible` turno; the cancha must exist and be active
    async fn create_turno(&self, nuevo: &NewTurno, precio_final: i64) -> TurnoResult<Turno>;

    async fn get_turno(&self, id: TurnoId) -> TurnoResult<Option<Turno>>;

    /// Matching turnos ordered by start time, then id
    async fn list_turnos(&self, filter: &TurnoFilter) -> TurnoResult<Vec<Turno>>;

    /// The single guarded entry point for turno state changes.
    ///
    /// Serialises per turno and per cancha, applies [`Turno::apply`],
    /// re-checks overlap exclusivity when the turno becomes occupying and, for
    /// `Reserve`, requires a completado pago of the same client.
    async fn transition_turno(
        &self,
        id: TurnoId,
        transition: &Transition,
        now: NaiveDateTime,
    ) -> TurnoResult<Change>;

    /// Delete a turno that is not occupying and has no completado pago
    async fn delete_turno(&self, id: TurnoId) -> TurnoResult<()>;

    async fn turno_servicios(&self, id: TurnoId) -> TurnoResult<Vec<TurnoServicio>>;

    /// Finish every `reservado` turno whose end is at or before `now`
    async fn finish_elapsed(&self, now: NaiveDateTime) -> TurnoResult<Vec<TurnoId>>;
}

/// Trait for payment records
#[async_trait]
pub trait PagoRepository: Send + Sync {
    /// Insert an `iniciado` pago after checking client, turno and amounts
    async fn create_pago(
        &self,
        nuevo: &NewPago,
        expires_at: Option<DateTime<Utc>>,
    ) -> PagoResult<Pago>;

    async fn get_pago(&self, id: PagoId) -> PagoResult<Option<Pago>>;

    async fn list_pagos(&self, filter: &PagoFilter) -> PagoResult<Vec<Pago>>;

    /// Complete a pago; a linked turno is reserved in the same atomic write
    async fn confirm_pago(
        &self,
        id: PagoId,
        confirmation: &Confirmation,
        at: DateTime<Utc>,
    ) -> PagoResult<Pago>;

    async fn fail_pago(&self, id: PagoId) -> PagoResult<Pago>;

    /// Delete a pago unless it backs a live reservation
    async fn delete_pago(&self, id: PagoId) -> PagoResult<()>;
}

/// Trait for tournaments and enrollments
#[async_trait]
pub trait TorneoRepository: Send + Sync {
    async fn create_torneo(&self, nuevo: &NewTorneo) -> TorneoResult<Torneo>;

    async fn get_torneo(&self, id: TorneoId) -> TorneoResult<Option<Torneo>>;

    async fn list_torneos(&self, estado: Option<TorneoState>) -> TorneoResult<Vec<Torneo>>;

    /// Apply an update, atomically with the enrolled-count capacity check
    async fn update_torneo(&self, id: TorneoId, update: &TorneoUpdate) -> TorneoResult<Torneo>;

    /// Release claimed turnos, drop partidos and enrollments, then drop the torneo, in one transaction
    async fn delete_torneo(&self, id: TorneoId) -> TorneoResult<TorneoRemoval>;

    /// Enroll one team, atomically with the capacity check
    async fn enroll_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<EnrollOutcome>;

    async fn withdraw_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<WithdrawOutcome>;

    async fn list_inscripciones(
        &self,
        filter: &InscripcionFilter,
    ) -> TorneoResult<Vec<Inscripcion>>;

    async fn count_inscripciones(&self, id_torneo: TorneoId) -> TorneoResult<i64>;

    /// Insert a partido; its turno must be claimed by its torneo and its teams enrolled
    async fn create_partido(&self, nuevo: &NewPartido) -> TorneoResult<Partido>;

    async fn get_partido(&self, id: PartidoId) -> TorneoResult<Option<Partido>>;

    async fn list_partidos(&self, filter: &PartidoFilter) -> TorneoResult<Vec<Partido>>;

    /// Merge an update under the same checks as creation
    async fn update_partido(&self, id: PartidoId, update: &PartidoUpdate)
    -> TorneoResult<Partido>;

    async fn delete_partido(&self, id: PartidoId) -> TorneoResult<()>;
}

/// Trait for teams and rosters
#[async_trait]
pub trait EquipoRepository: Send + Sync {
    async fn create_equipo(&self, nuevo: &NewEquipo) -> EquipoResult<Equipo>;

    async fn get_equipo(&self, id: EquipoId) -> EquipoResult<Option<Equipo>>;

    async fn list_equipos(&self) -> EquipoResult<Vec<Equipo>>;

    async fn add_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberAddOutcome>;

    async fn remove_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberRemoveOutcome>;

    async fn list_miembros(&self, id_equipo: EquipoId) -> EquipoResult<Vec<EquipoMiembro>>;
}

/// Trait for the all-or-nothing booking write
#[async_trait]
pub trait ReservaRepository: Send + Sync {
    /// Insert the pago, confirm it, reserve the turno and record its services.
    ///
    /// Either every record is written or none is.
    async fn book(&self, order: &BookingOrder) -> BookingResult<BookedRecords>;
}

/// Complete storage backend used by the engine
#[async_trait]
pub trait Store:
    CatalogRepository
    + TurnoRepository
    + PagoRepository
    + TorneoRepository
    + EquipoRepository
    + ReservaRepository
    + Send
    + Sync
{
    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    async fn health_check(&self) -> bool;
}
