//! In-memory store.
//!
//! The whole state sits behind one `tokio::sync::RwLock`; every write takes
//! the write lock for its full duration, which gives each call the same
//! atomicity a database transaction gives [`PgStore`](super::PgStore).
//! Changes are planned against the locked state first and applied only once
//! every guard passed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::sync::RwLock;

use super::repository::{
    CatalogRepository, EquipoRepository, PagoRepository, ReservaRepository, Store,
    TorneoRepository, TurnoRepository,
};
use crate::booking::{BookedRecords, BookingError, BookingOrder, BookingResult, BookingStep};
use crate::catalog::{
    Cancha, CanchaId, CatalogError, CatalogResult, Cliente, ClienteId, NewCancha, NewCliente,
    NewServicio, NewTarifa, ServicioAdicional, ServicioId, Tarifa, TarifaId,
};
use crate::clock;
use crate::equipo::{
    Equipo, EquipoError, EquipoId, EquipoMiembro, EquipoResult, MemberAddOutcome,
    MemberRemoveOutcome, NewEquipo,
};
use crate::pago::{
    Confirmation, NewPago, Pago, PagoError, PagoFilter, PagoId, PagoResult, PagoState,
};
use crate::torneo::{
    EnrollOutcome, Inscripcion, InscripcionFilter, NewPartido, NewTorneo, Partido, PartidoFilter,
    PartidoId, PartidoUpdate, Torneo, TorneoError, TorneoId, TorneoRemoval, TorneoResult,
    TorneoState, TorneoUpdate, WithdrawOutcome,
};
use crate::turno::{
    BlockReason, Change, NewTurno, Transition, Turno, TurnoError, TurnoFilter, TurnoId,
    TurnoResult, TurnoServicio, TurnoState,
};

#[derive(Debug, Default)]
struct Sequences {
    cancha: i64,
    tarifa: i64,
    servicio: i64,
    cliente: i64,
    turno: i64,
    pago: i64,
    torneo: i64,
    equipo: i64,
    partido: i64,
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Default)]
struct State {
    seq: Sequences,
    canchas: BTreeMap<CanchaId, Cancha>,
    tarifas: BTreeMap<TarifaId, Tarifa>,
    servicios: BTreeMap<ServicioId, ServicioAdicional>,
    clientes: BTreeMap<ClienteId, Cliente>,
    turnos: BTreeMap<TurnoId, Turno>,
    turno_servicios: BTreeMap<(TurnoId, ServicioId), TurnoServicio>,
    pagos: BTreeMap<PagoId, Pago>,
    torneos: BTreeMap<TorneoId, Torneo>,
    inscripciones: BTreeMap<(TorneoId, EquipoId), Inscripcion>,
    partidos: BTreeMap<PartidoId, Partido>,
    equipos: BTreeMap<EquipoId, Equipo>,
    miembros: BTreeSet<EquipoMiembro>,
}

impl State {
    /// Occupying turno on the same cancha intersecting `turno`, if any
    fn overlapping(&self, turno: &Turno) -> Option<TurnoId> {
        self.turnos
            .values()
            .find(|other| {
                other.id != turno.id
                    && other.id_cancha == turno.id_cancha
                    && other.estado.is_occupying()
                    && other.overlaps(turno.fecha_hora_inicio, turno.fecha_hora_fin)
            })
            .map(|other| other.id)
    }

    fn completed_pago_for(&self, id_turno: TurnoId) -> Option<&Pago> {
        self.pagos
            .values()
            .find(|p| p.id_turno == Some(id_turno) && p.estado == PagoState::Completado)
    }

    /// Run every guard of a turno transition without mutating anything.
    ///
    /// `pending` is a pago being completed in the same write; it counts as
    /// stored for the payment requirement.
    fn plan_transition(
        &self,
        id: TurnoId,
        transition: &Transition,
        now: NaiveDateTime,
        pending: Option<&Pago>,
    ) -> TurnoResult<Change> {
        let turno = self.turnos.get(&id).ok_or(TurnoError::NotFound(id))?;
        if let Transition::Block {
            reason: BlockReason::Torneo(id_torneo),
            ..
        } = transition
        {
            if !self.torneos.contains_key(id_torneo) {
                return Err(TurnoError::TorneoNotFound(*id_torneo));
            }
        }
        let change = turno.apply(transition, now)?;

        if let Change::Applied(next) = &change {
            if let Transition::Reserve { id_cliente, .. } = transition {
                if !self.clientes.contains_key(id_cliente) {
                    return Err(TurnoError::ClienteNotFound(*id_cliente));
                }
                let paid_by = |p: &Pago| {
                    p.id_turno == Some(id)
                        && p.id_cliente == *id_cliente
                        && p.estado == PagoState::Completado
                };
                let paid = pending.is_some_and(paid_by) || self.pagos.values().any(paid_by);
                if !paid {
                    return Err(TurnoError::PaymentRequired(id));
                }
            }
            if next.estado.is_occupying() && !turno.estado.is_occupying() {
                if let Some(other) = self.overlapping(next) {
                    return Err(TurnoError::Overlap { id, other });
                }
            }
        }
        Ok(change)
    }

    fn commit(&mut self, change: &Change) {
        if let Change::Applied(turno) = change {
            self.turnos.insert(turno.id, turno.clone());
        }
    }

    fn enrolled(&self, id_torneo: TorneoId) -> i64 {
        self.inscripciones
            .keys()
            .filter(|(torneo, _)| *torneo == id_torneo)
            .count() as i64
    }

    /// Guards for writing `partido`; only fields changed from `previous` are rechecked
    fn check_partido(&self, partido: &Partido, previous: Option<&Partido>) -> TorneoResult<()> {
        partido.validate()?;
        let id_torneo = partido.id_torneo;
        if !self.torneos.contains_key(&id_torneo) {
            return Err(TorneoError::NotFound(id_torneo));
        }

        if let Some(id_turno) = partido.id_turno {
            if previous.is_none_or(|p| p.id_turno != Some(id_turno)) {
                let turno = self
                    .turnos
                    .get(&id_turno)
                    .ok_or(TurnoError::NotFound(id_turno))?;
                if turno.estado != TurnoState::Bloqueado
                    || turno.id_torneo_bloqueo != Some(id_torneo)
                {
                    return Err(TorneoError::TurnoNotClaimed {
                        id_turno,
                        id_torneo,
                    });
                }
            }
            if let Some(other) = self
                .partidos
                .values()
                .find(|p| p.id != partido.id && p.id_turno == Some(id_turno))
            {
                return Err(TorneoError::TurnoInUse {
                    id_turno,
                    id_partido: other.id,
                });
            }
        }

        let known: Vec<EquipoId> = previous.map(|p| p.equipos().collect()).unwrap_or_default();
        for id_equipo in partido.equipos().filter(|e| !known.contains(e)) {
            if !self.equipos.contains_key(&id_equipo) {
                return Err(TorneoError::EquipoNotFound(id_equipo));
            }
            if !self.inscripciones.contains_key(&(id_torneo, id_equipo)) {
                return Err(TorneoError::NotEnrolled {
                    id_equipo,
                    id_torneo,
                });
            }
        }
        Ok(())
    }
}

/// Store keeping every record in process memory
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_cancha(&self, nueva: &NewCancha) -> CatalogResult<Cancha> {
        let mut state = self.state.write().await;
        let cancha = Cancha {
            id: next_id(&mut state.seq.cancha),
            nombre: nueva.nombre.clone(),
            tipo_deporte: nueva.tipo_deporte.clone(),
            descripcion: nueva.descripcion.clone(),
            activa: nueva.activa,
        };
        state.canchas.insert(cancha.id, cancha.clone());
        Ok(cancha)
    }

    async fn get_cancha(&self, id: CanchaId) -> CatalogResult<Option<Cancha>> {
        Ok(self.state.read().await.canchas.get(&id).cloned())
    }

    async fn list_canchas(&self) -> CatalogResult<Vec<Cancha>> {
        Ok(self.state.read().await.canchas.values().cloned().collect())
    }

    async fn create_tarifa(&self, nueva: &NewTarifa) -> CatalogResult<Tarifa> {
        let mut state = self.state.write().await;
        if !state.canchas.contains_key(&nueva.id_cancha) {
            return Err(CatalogError::CanchaNotFound(nueva.id_cancha));
        }
        let tarifa = Tarifa {
            id: next_id(&mut state.seq.tarifa),
            id_cancha: nueva.id_cancha,
            descripcion: nueva.descripcion.clone(),
            precio_hora: nueva.precio_hora,
            created_at: Utc::now(),
        };
        state.tarifas.insert(tarifa.id, tarifa.clone());
        Ok(tarifa)
    }

    async fn tarifa_for_cancha(&self, id_cancha: CanchaId) -> CatalogResult<Option<Tarifa>> {
        let state = self.state.read().await;
        Ok(state
            .tarifas
            .values()
            .rev()
            .find(|t| t.id_cancha == id_cancha)
            .cloned())
    }

    async fn list_tarifas(&self) -> CatalogResult<Vec<Tarifa>> {
        Ok(self.state.read().await.tarifas.values().cloned().collect())
    }

    async fn create_servicio(&self, nuevo: &NewServicio) -> CatalogResult<ServicioAdicional> {
        let mut state = self.state.write().await;
        let servicio = ServicioAdicional {
            id: next_id(&mut state.seq.servicio),
            nombre: nuevo.nombre.clone(),
            precio_actual: nuevo.precio_actual,
            activo: nuevo.activo,
        };
        state.servicios.insert(servicio.id, servicio.clone());
        Ok(servicio)
    }

    async fn get_servicio(&self, id: ServicioId) -> CatalogResult<Option<ServicioAdicional>> {
        Ok(self.state.read().await.servicios.get(&id).cloned())
    }

    async fn list_servicios(&self) -> CatalogResult<Vec<ServicioAdicional>> {
        Ok(self.state.read().await.servicios.values().cloned().collect())
    }

    async fn set_servicio_activo(
        &self,
        id: ServicioId,
        activo: bool,
    ) -> CatalogResult<ServicioAdicional> {
        let mut state = self.state.write().await;
        let servicio = state
            .servicios
            .get_mut(&id)
            .ok_or(CatalogError::ServicioNotFound(id))?;
        servicio.activo = activo;
        Ok(servicio.clone())
    }

    async fn create_cliente(&self, nuevo: &NewCliente) -> CatalogResult<Cliente> {
        let mut state = self.state.write().await;
        let cliente = Cliente {
            id: next_id(&mut state.seq.cliente),
            nombre: nuevo.nombre.clone(),
            apellido: nuevo.apellido.clone(),
            telefono: nuevo.telefono.clone(),
            email: nuevo.email.clone(),
        };
        state.clientes.insert(cliente.id, cliente.clone());
        Ok(cliente)
    }

    async fn get_cliente(&self, id: ClienteId) -> CatalogResult<Option<Cliente>> {
        Ok(self.state.read().await.clientes.get(&id).cloned())
    }

    async fn list_clientes(&self) -> CatalogResult<Vec<Cliente>> {
        Ok(self.state.read().await.clientes.values().cloned().collect())
    }
}

#[async_trait]
impl TurnoRepository for MemoryStore {
    async fn create_turno(&self, nuevo: &NewTurno, precio_final: i64) -> TurnoResult<Turno> {
        let mut state = self.state.write().await;
        match state.canchas.get(&nuevo.id_cancha) {
            None => return Err(TurnoError::CanchaNotFound(nuevo.id_cancha)),
            Some(cancha) if !cancha.activa => {
                return Err(TurnoError::CanchaInactive(nuevo.id_cancha));
            }
            Some(_) => {}
        }
        let turno = Turno {
            id: next_id(&mut state.seq.turno),
            id_cancha: nuevo.id_cancha,
            fecha_hora_inicio: nuevo.fecha_hora_inicio,
            fecha_hora_fin: nuevo.fecha_hora_fin,
            estado: TurnoState::Disponible,
            precio_final,
            id_cliente: None,
            id_usuario_registro: nuevo.id_usuario_registro,
            reserva_created_at: None,
            id_usuario_bloqueo: None,
            motivo_bloqueo: None,
            id_torneo_bloqueo: None,
        };
        state.turnos.insert(turno.id, turno.clone());
        Ok(turno)
    }

    async fn get_turno(&self, id: TurnoId) -> TurnoResult<Option<Turno>> {
        Ok(self.state.read().await.turnos.get(&id).cloned())
    }

    async fn list_turnos(&self, filter: &TurnoFilter) -> TurnoResult<Vec<Turno>> {
        let state = self.state.read().await;
        let mut turnos: Vec<Turno> = state
            .turnos
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        turnos.sort_by_key(|t| (t.fecha_hora_inicio, t.id));
        Ok(turnos)
    }

    async fn transition_turno(
        &self,
        id: TurnoId,
        transition: &Transition,
        now: NaiveDateTime,
    ) -> TurnoResult<Change> {
        let mut state = self.state.write().await;
        let change = state.plan_transition(id, transition, now, None)?;
        state.commit(&change);
        Ok(change)
    }

    async fn delete_turno(&self, id: TurnoId) -> TurnoResult<()> {
        let mut state = self.state.write().await;
        let turno = state.turnos.get(&id).ok_or(TurnoError::NotFound(id))?;
        if turno.estado.is_occupying() {
            return Err(TurnoError::Occupied(id));
        }
        if state.completed_pago_for(id).is_some() {
            return Err(TurnoError::HasCompletedPayment(id));
        }
        state.turnos.remove(&id);
        state.turno_servicios.retain(|(turno, _), _| *turno != id);
        state.pagos.retain(|_, p| p.id_turno != Some(id));
        for partido in state.partidos.values_mut() {
            if partido.id_turno == Some(id) {
                partido.id_turno = None;
            }
        }
        Ok(())
    }

    async fn turno_servicios(&self, id: TurnoId) -> TurnoResult<Vec<TurnoServicio>> {
        let state = self.state.read().await;
        if !state.turnos.contains_key(&id) {
            return Err(TurnoError::NotFound(id));
        }
        Ok(state
            .turno_servicios
            .range((id, ServicioId::MIN)..=(id, ServicioId::MAX))
            .map(|(_, s)| s.clone())
            .collect())
    }

    async fn finish_elapsed(&self, now: NaiveDateTime) -> TurnoResult<Vec<TurnoId>> {
        let mut state = self.state.write().await;
        let due: Vec<TurnoId> = state
            .turnos
            .values()
            .filter(|t| t.estado == TurnoState::Reservado && t.fecha_hora_fin <= now)
            .map(|t| t.id)
            .collect();
        for id in &due {
            let change = state.plan_transition(*id, &Transition::Finish, now, None)?;
            state.commit(&change);
        }
        Ok(due)
    }
}

#[async_trait]
impl PagoRepository for MemoryStore {
    async fn create_pago(
        &self,
        nuevo: &NewPago,
        expires_at: Option<DateTime<Utc>>,
    ) -> PagoResult<Pago> {
        let monto_total = nuevo.total()?;
        let mut state = self.state.write().await;
        if !state.clientes.contains_key(&nuevo.id_cliente) {
            return Err(PagoError::ClienteNotFound(nuevo.id_cliente));
        }
        if let Some(id_turno) = nuevo.id_turno {
            if !state.turnos.contains_key(&id_turno) {
                return Err(PagoError::TurnoNotFound(id_turno));
            }
            if state.completed_pago_for(id_turno).is_some() {
                return Err(PagoError::TurnoAlreadyPaid(id_turno));
            }
        }
        let pago = Pago {
            id: next_id(&mut state.seq.pago),
            id_turno: nuevo.id_turno,
            monto_turno: nuevo.monto_turno,
            monto_servicios: nuevo.monto_servicios,
            monto_total,
            id_cliente: nuevo.id_cliente,
            id_usuario_registro: nuevo.id_usuario_registro,
            estado: PagoState::Iniciado,
            metodo_pago: nuevo.metodo_pago.clone(),
            id_gateway_externo: None,
            fecha_creacion: Utc::now(),
            fecha_expiracion: expires_at,
            fecha_completado: None,
        };
        state.pagos.insert(pago.id, pago.clone());
        Ok(pago)
    }

    async fn get_pago(&self, id: PagoId) -> PagoResult<Option<Pago>> {
        Ok(self.state.read().await.pagos.get(&id).cloned())
    }

    async fn list_pagos(&self, filter: &PagoFilter) -> PagoResult<Vec<Pago>> {
        let state = self.state.read().await;
        Ok(state
            .pagos
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn confirm_pago(
        &self,
        id: PagoId,
        confirmation: &Confirmation,
        at: DateTime<Utc>,
    ) -> PagoResult<Pago> {
        let mut state = self.state.write().await;
        let pago = state.pagos.get(&id).ok_or(PagoError::NotFound(id))?;
        let confirmed = pago.confirmed(confirmation, at)?;

        let change = match confirmed.id_turno {
            Some(id_turno) => {
                if state.completed_pago_for(id_turno).is_some() {
                    return Err(PagoError::TurnoAlreadyPaid(id_turno));
                }
                let reserve = Transition::Reserve {
                    id_cliente: confirmed.id_cliente,
                    id_usuario_registro: confirmed.id_usuario_registro,
                    at,
                };
                Some(state.plan_transition(
                    id_turno,
                    &reserve,
                    clock::to_local(at),
                    Some(&confirmed),
                )?)
            }
            None => None,
        };

        state.pagos.insert(id, confirmed.clone());
        if let Some(change) = change {
            state.commit(&change);
        }
        Ok(confirmed)
    }

    async fn fail_pago(&self, id: PagoId) -> PagoResult<Pago> {
        let mut state = self.state.write().await;
        let pago = state.pagos.get(&id).ok_or(PagoError::NotFound(id))?;
        let failed = pago.failed()?;
        state.pagos.insert(id, failed.clone());
        Ok(failed)
    }

    async fn delete_pago(&self, id: PagoId) -> PagoResult<()> {
        let mut state = self.state.write().await;
        let pago = state.pagos.get(&id).ok_or(PagoError::NotFound(id))?;
        if pago.estado == PagoState::Completado {
            if let Some(id_turno) = pago.id_turno {
                let live = state
                    .turnos
                    .get(&id_turno)
                    .is_some_and(|t| t.estado == TurnoState::Reservado);
                if live {
                    return Err(PagoError::BacksReservation { id, id_turno });
                }
            }
        }
        state.pagos.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl TorneoRepository for MemoryStore {
    async fn create_torneo(&self, nuevo: &NewTorneo) -> TorneoResult<Torneo> {
        let mut state = self.state.write().await;
        let torneo = Torneo {
            id: next_id(&mut state.seq.torneo),
            nombre: nuevo.nombre.clone(),
            tipo_deporte: nuevo.tipo_deporte.clone(),
            created_at: Utc::now(),
            fecha_inicio: nuevo.fecha_inicio,
            fecha_fin: nuevo.fecha_fin,
            costo_inscripcion: nuevo.costo_inscripcion,
            cupos: nuevo.cupos,
            reglas: nuevo.reglas.clone(),
            estado: nuevo.estado,
        };
        state.torneos.insert(torneo.id, torneo.clone());
        Ok(torneo)
    }

    async fn get_torneo(&self, id: TorneoId) -> TorneoResult<Option<Torneo>> {
        Ok(self.state.read().await.torneos.get(&id).cloned())
    }

    async fn list_torneos(&self, estado: Option<TorneoState>) -> TorneoResult<Vec<Torneo>> {
        let state = self.state.read().await;
        Ok(state
            .torneos
            .values()
            .filter(|t| estado.is_none_or(|e| t.estado == e))
            .cloned()
            .collect())
    }

    async fn update_torneo(&self, id: TorneoId, update: &TorneoUpdate) -> TorneoResult<Torneo> {
        let mut state = self.state.write().await;
        let torneo = state.torneos.get(&id).ok_or(TorneoError::NotFound(id))?;
        let updated = update.apply_to(torneo, state.enrolled(id))?;
        state.torneos.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_torneo(&self, id: TorneoId) -> TorneoResult<TorneoRemoval> {
        let mut state = self.state.write().await;
        if !state.torneos.contains_key(&id) {
            return Err(TorneoError::NotFound(id));
        }

        let claimed: Vec<TurnoId> = state
            .turnos
            .values()
            .filter(|t| t.estado == TurnoState::Bloqueado && t.id_torneo_bloqueo == Some(id))
            .map(|t| t.id)
            .collect();
        let release = Transition::Release { owner: Some(id) };
        let now = clock::now_local();
        let mut changes = Vec::with_capacity(claimed.len());
        for turno in &claimed {
            changes.push(state.plan_transition(*turno, &release, now, None)?);
        }

        for change in &changes {
            state.commit(change);
        }
        let before = state.inscripciones.len();
        state.inscripciones.retain(|(torneo, _), _| *torneo != id);
        let removed = (before - state.inscripciones.len()) as u64;
        let before = state.partidos.len();
        state.partidos.retain(|_, p| p.id_torneo != id);
        let partidos = (before - state.partidos.len()) as u64;
        state.torneos.remove(&id);

        Ok(TorneoRemoval {
            id_torneo: id,
            turnos_liberados: claimed,
            inscripciones_eliminadas: removed,
            partidos_eliminados: partidos,
        })
    }

    async fn enroll_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<EnrollOutcome> {
        let mut state = self.state.write().await;
        let torneo = state
            .torneos
            .get(&id_torneo)
            .ok_or(TorneoError::NotFound(id_torneo))?;
        if !state.equipos.contains_key(&id_equipo) {
            return Ok(EnrollOutcome::NoEncontrado);
        }
        if state.inscripciones.contains_key(&(id_torneo, id_equipo)) {
            return Ok(EnrollOutcome::YaInscrito);
        }
        if !torneo.estado.accepts_enrollment() {
            let motivo = TorneoError::Closed {
                id: id_torneo,
                estado: torneo.estado,
            }
            .to_string();
            return Ok(EnrollOutcome::Rechazado { motivo });
        }
        if !torneo.has_room(state.enrolled(id_torneo)) {
            return Ok(EnrollOutcome::SinCupo);
        }
        state.inscripciones.insert(
            (id_torneo, id_equipo),
            Inscripcion {
                id_equipo,
                id_torneo,
                fecha_inscripcion: Some(Utc::now()),
            },
        );
        Ok(EnrollOutcome::Inscrito)
    }

    async fn withdraw_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<WithdrawOutcome> {
        let mut state = self.state.write().await;
        Ok(match state.inscripciones.remove(&(id_torneo, id_equipo)) {
            Some(_) => WithdrawOutcome::Retirado,
            None => WithdrawOutcome::NoInscrito,
        })
    }

    async fn list_inscripciones(
        &self,
        filter: &InscripcionFilter,
    ) -> TorneoResult<Vec<Inscripcion>> {
        let state = self.state.read().await;
        Ok(state
            .inscripciones
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn count_inscripciones(&self, id_torneo: TorneoId) -> TorneoResult<i64> {
        Ok(self.state.read().await.enrolled(id_torneo))
    }

    async fn create_partido(&self, nuevo: &NewPartido) -> TorneoResult<Partido> {
        let mut state = self.state.write().await;
        let mut partido = nuevo.clone().into_partido(0);
        state.check_partido(&partido, None)?;
        partido.id = next_id(&mut state.seq.partido);
        state.partidos.insert(partido.id, partido.clone());
        Ok(partido)
    }

    async fn get_partido(&self, id: PartidoId) -> TorneoResult<Option<Partido>> {
        Ok(self.state.read().await.partidos.get(&id).cloned())
    }

    async fn list_partidos(&self, filter: &PartidoFilter) -> TorneoResult<Vec<Partido>> {
        let state = self.state.read().await;
        Ok(state
            .partidos
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn update_partido(
        &self,
        id: PartidoId,
        update: &PartidoUpdate,
    ) -> TorneoResult<Partido> {
        let mut state = self.state.write().await;
        let current = state
            .partidos
            .get(&id)
            .ok_or(TorneoError::PartidoNotFound(id))?;
        let updated = update.apply_to(current)?;
        state.check_partido(&updated, Some(current))?;
        state.partidos.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete_partido(&self, id: PartidoId) -> TorneoResult<()> {
        let mut state = self.state.write().await;
        state
            .partidos
            .remove(&id)
            .map(|_| ())
            .ok_or(TorneoError::PartidoNotFound(id))
    }
}

#[async_trait]
impl EquipoRepository for MemoryStore {
    async fn create_equipo(&self, nuevo: &NewEquipo) -> EquipoResult<Equipo> {
        let mut state = self.state.write().await;
        if state
            .equipos
            .values()
            .any(|e| e.nombre_equipo == nuevo.nombre_equipo)
        {
            return Err(EquipoError::DuplicateName(nuevo.nombre_equipo.clone()));
        }
        if let Some(capitan) = nuevo.id_capitan {
            if !state.clientes.contains_key(&capitan) {
                return Err(EquipoError::ClienteNotFound(capitan));
            }
        }
        let equipo = Equipo {
            id: next_id(&mut state.seq.equipo),
            nombre_equipo: nuevo.nombre_equipo.clone(),
            id_capitan: nuevo.id_capitan,
        };
        state.equipos.insert(equipo.id, equipo.clone());
        Ok(equipo)
    }

    async fn get_equipo(&self, id: EquipoId) -> EquipoResult<Option<Equipo>> {
        Ok(self.state.read().await.equipos.get(&id).cloned())
    }

    async fn list_equipos(&self) -> EquipoResult<Vec<Equipo>> {
        Ok(self.state.read().await.equipos.values().cloned().collect())
    }

    async fn add_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberAddOutcome> {
        let mut state = self.state.write().await;
        if !state.equipos.contains_key(&id_equipo) {
            return Err(EquipoError::NotFound(id_equipo));
        }
        if !state.clientes.contains_key(&id_cliente) {
            return Ok(MemberAddOutcome::ClienteNoEncontrado);
        }
        let inserted = state.miembros.insert(EquipoMiembro {
            id_equipo,
            id_cliente,
        });
        Ok(if inserted {
            MemberAddOutcome::Agregado
        } else {
            MemberAddOutcome::YaMiembro
        })
    }

    async fn remove_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberRemoveOutcome> {
        let mut state = self.state.write().await;
        if !state.equipos.contains_key(&id_equipo) {
            return Err(EquipoError::NotFound(id_equipo));
        }
        let removed = state.miembros.remove(&EquipoMiembro {
            id_equipo,
            id_cliente,
        });
        Ok(if removed {
            MemberRemoveOutcome::Eliminado
        } else {
            MemberRemoveOutcome::NoMiembro
        })
    }

    async fn list_miembros(&self, id_equipo: EquipoId) -> EquipoResult<Vec<EquipoMiembro>> {
        let state = self.state.read().await;
        if !state.equipos.contains_key(&id_equipo) {
            return Err(EquipoError::NotFound(id_equipo));
        }
        Ok(state
            .miembros
            .iter()
            .filter(|m| m.id_equipo == id_equipo)
            .copied()
            .collect())
    }
}

#[async_trait]
impl ReservaRepository for MemoryStore {
    async fn book(&self, order: &BookingOrder) -> BookingResult<BookedRecords> {
        let mut state = self.state.write().await;
        let current = state
            .turnos
            .get(&order.id_turno)
            .ok_or(BookingError::Reservation(TurnoError::NotFound(order.id_turno)))?;
        if current.estado != TurnoState::Disponible {
            return Err(BookingError::Reservation(TurnoError::NotAvailable {
                id: current.id,
                estado: current.estado,
            }));
        }

        // Pago: insert iniciado
        let monto_total = order
            .pago
            .total()
            .map_err(|e| BookingError::payment(BookingStep::Pago, e))?;
        if state.completed_pago_for(order.id_turno).is_some() {
            return Err(BookingError::payment(
                BookingStep::Pago,
                PagoError::TurnoAlreadyPaid(order.id_turno),
            ));
        }
        let pago = Pago {
            id: next_id(&mut state.seq.pago),
            id_turno: Some(order.id_turno),
            monto_turno: order.pago.monto_turno,
            monto_servicios: order.pago.monto_servicios,
            monto_total,
            id_cliente: order.id_cliente,
            id_usuario_registro: order.id_usuario_registro,
            estado: PagoState::Iniciado,
            metodo_pago: order.pago.metodo_pago.clone(),
            id_gateway_externo: None,
            fecha_creacion: order.at,
            fecha_expiracion: order.expires_at,
            fecha_completado: None,
        };

        // Confirmacion
        let confirmed = pago
            .confirmed(&order.confirmation, order.at)
            .map_err(|e| BookingError::payment(BookingStep::Confirmacion, e))?;

        // Reserva
        let reserve = Transition::Reserve {
            id_cliente: order.id_cliente,
            id_usuario_registro: order.id_usuario_registro,
            at: order.at,
        };
        let change = state
            .plan_transition(
                order.id_turno,
                &reserve,
                clock::to_local(order.at),
                Some(&confirmed),
            )
            .map_err(BookingError::Reservation)?;
        let mut turno = change.into_turno();
        turno.precio_final = order.quote.precio_final;

        // Servicios
        for servicio in &order.servicios {
            if !state.servicios.contains_key(&servicio.id_servicio) {
                return Err(BookingError::ServicioNotFound(servicio.id_servicio));
            }
        }

        state.pagos.insert(confirmed.id, confirmed.clone());
        state.turnos.insert(turno.id, turno.clone());
        for servicio in &order.servicios {
            state
                .turno_servicios
                .insert((servicio.id_turno, servicio.id_servicio), servicio.clone());
        }

        Ok(BookedRecords {
            turno,
            pago: confirmed,
            servicios: order.servicios.clone(),
        })
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> bool {
        true
    }
}
