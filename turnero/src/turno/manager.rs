//! Turno manager implementation.

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};

use super::{
    errors::{TurnoError, TurnoResult},
    models::{
        BlockReason, Change, NewTurno, Transition, Turno, TurnoDetail, TurnoFilter, TurnoId,
        TurnoServicio, TurnoState, TurnoTotal, TurnoUpdate, validate_interval,
    },
};
use crate::catalog::{CanchaId, ClienteId, UsuarioId};
use crate::clock;
use crate::db::Store;
use crate::pricing::TariffResolver;

/// Turno manager: the only path through which turno state changes
#[derive(Clone)]
pub struct TurnoManager {
    store: Arc<dyn Store>,
    resolver: TariffResolver,
}

impl TurnoManager {
    /// Create a new turno manager
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            resolver: TariffResolver::new(store.clone()),
            store,
        }
    }

    /// Create a `disponible` turno priced from the court's current tariff.
    ///
    /// # Errors
    ///
    /// * `TurnoError::InvalidInterval` - `fin <= inicio`
    /// * `TurnoError::Tarifa` - Court does not exist
    /// * `TurnoError::CanchaInactive` - Court is not active
    pub async fn create(&self, nuevo: NewTurno) -> TurnoResult<Turno> {
        nuevo.validate()?;
        let quote = self
            .resolver
            .quote(
                nuevo.id_cancha,
                nuevo.fecha_hora_inicio,
                nuevo.fecha_hora_fin,
            )
            .await?;
        let turno = self.store.create_turno(&nuevo, quote.precio_final).await?;
        log::info!(
            "Created turno {} on cancha {} ({} - {}), precio {}",
            turno.id,
            turno.id_cancha,
            turno.fecha_hora_inicio,
            turno.fecha_hora_fin,
            turno.precio_final
        );
        Ok(turno)
    }

    pub async fn get(&self, id: TurnoId) -> TurnoResult<Turno> {
        self.store
            .get_turno(id)
            .await?
            .ok_or(TurnoError::NotFound(id))
    }

    pub async fn list(&self, filter: &TurnoFilter) -> TurnoResult<Vec<Turno>> {
        self.store.list_turnos(filter).await
    }

    /// `disponible` turnos of a court lying fully within `[desde, hasta)`
    pub async fn available(
        &self,
        id_cancha: CanchaId,
        desde: NaiveDateTime,
        hasta: NaiveDateTime,
    ) -> TurnoResult<Vec<Turno>> {
        validate_interval(desde, hasta)?;
        let filter = TurnoFilter {
            id_cancha: Some(id_cancha),
            estado: Some(TurnoState::Disponible),
            ..Default::default()
        };
        let turnos = self.store.list_turnos(&filter).await?;
        Ok(turnos
            .into_iter()
            .filter(|t| t.fecha_hora_inicio >= desde && t.fecha_hora_fin <= hasta)
            .collect())
    }

    /// Turno with services and total.
    ///
    /// When `id_cliente` is given the turno must be reserved by that client.
    ///
    /// # Errors
    ///
    /// * `TurnoError::NotFound` - Unknown turno
    /// * `TurnoError::NotReservedBy` - The turno belongs to someone else
    pub async fn detail(
        &self,
        id: TurnoId,
        id_cliente: Option<ClienteId>,
    ) -> TurnoResult<TurnoDetail> {
        let turno = self.get(id).await?;
        if let Some(id_cliente) = id_cliente {
            Self::check_owner(&turno, id_cliente)?;
        }
        let servicios = self.store.turno_servicios(id).await?;
        let total = TurnoTotal::compute(&turno, &servicios)?;
        Ok(TurnoDetail {
            turno,
            servicios,
            precio_total: total.precio_total,
        })
    }

    pub async fn servicios(&self, id: TurnoId) -> TurnoResult<Vec<TurnoServicio>> {
        self.store.turno_servicios(id).await
    }

    /// `precio_final` plus every booked service at its frozen price
    pub async fn precio_total(&self, id: TurnoId) -> TurnoResult<TurnoTotal> {
        let turno = self.get(id).await?;
        let servicios = self.store.turno_servicios(id).await?;
        TurnoTotal::compute(&turno, &servicios)
    }

    /// Run a transition through the store's guarded entry point.
    ///
    /// # Arguments
    ///
    /// * `id` - Turno ID
    /// * `transition` - Requested change
    /// * `now` - Facility-local clock used by time guards
    ///
    /// # Returns
    ///
    /// * `TurnoResult<Change>` - Applied or idempotent no-op
    pub async fn transition(
        &self,
        id: TurnoId,
        transition: &Transition,
        now: NaiveDateTime,
    ) -> TurnoResult<Change> {
        match self.store.transition_turno(id, transition, now).await {
            Ok(change) => {
                if change.is_applied() {
                    log::info!("Turno {} -> {}", id, change.turno().estado);
                } else {
                    log::debug!("Turno {} already {}", id, change.turno().estado);
                }
                Ok(change)
            }
            Err(e) => {
                log::warn!(
                    "Turno {} transition to {} rejected: {}",
                    id,
                    transition.target(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Reserve a turno that already has a completado pago from the client
    pub async fn reserve(
        &self,
        id: TurnoId,
        id_cliente: ClienteId,
        id_usuario_registro: Option<UsuarioId>,
    ) -> TurnoResult<Turno> {
        let transition = Transition::Reserve {
            id_cliente,
            id_usuario_registro,
            at: Utc::now(),
        };
        Ok(self
            .transition(id, &transition, clock::now_local())
            .await?
            .into_turno())
    }

    /// Block a turno.
    ///
    /// Tournament reasons must name an existing torneo; the store checks it
    /// inside the guarded write.
    pub async fn block(
        &self,
        id: TurnoId,
        reason: BlockReason,
        id_usuario_bloqueo: Option<UsuarioId>,
    ) -> TurnoResult<Turno> {
        let transition = Transition::Block {
            reason,
            id_usuario_bloqueo,
        };
        Ok(self
            .transition(id, &transition, clock::now_local())
            .await?
            .into_turno())
    }

    /// Administrative release of any block; no-op when already `disponible`
    pub async fn release(&self, id: TurnoId) -> TurnoResult<Turno> {
        Ok(self
            .transition(id, &Transition::Release { owner: None }, clock::now_local())
            .await?
            .into_turno())
    }

    /// Cancel a reservation before it ends
    ///
    /// # Errors
    ///
    /// * `TurnoError::NotReservedBy` - `id_cliente` given and not the owner
    /// * `TurnoError::AlreadyElapsed` - The slot already ended
    pub async fn cancel(&self, id: TurnoId, id_cliente: Option<ClienteId>) -> TurnoResult<Turno> {
        self.cancel_at(id, id_cliente, clock::now_local()).await
    }

    pub async fn cancel_at(
        &self,
        id: TurnoId,
        id_cliente: Option<ClienteId>,
        now: NaiveDateTime,
    ) -> TurnoResult<Turno> {
        if let Some(id_cliente) = id_cliente {
            // The client of a reservation never changes, so checking before the write is safe
            let turno = self.get(id).await?;
            Self::check_owner(&turno, id_cliente)?;
        }
        Ok(self
            .transition(id, &Transition::Cancel, now)
            .await?
            .into_turno())
    }

    pub async fn finish(&self, id: TurnoId) -> TurnoResult<Turno> {
        Ok(self
            .transition(id, &Transition::Finish, clock::now_local())
            .await?
            .into_turno())
    }

    /// Close every reservation whose slot has ended
    pub async fn finish_elapsed(&self) -> TurnoResult<Vec<TurnoId>> {
        self.finish_elapsed_at(clock::now_local()).await
    }

    pub async fn finish_elapsed_at(&self, now: NaiveDateTime) -> TurnoResult<Vec<TurnoId>> {
        let finished = self.store.finish_elapsed(now).await?;
        if !finished.is_empty() {
            log::info!("Finished {} elapsed turnos", finished.len());
        }
        Ok(finished)
    }

    /// Generic state change (`PUT /turnos/{id}`)
    pub async fn update_state(&self, id: TurnoId, update: &TurnoUpdate) -> TurnoResult<Turno> {
        let transition = update.transition(Utc::now())?;
        match transition {
            Transition::Block {
                reason,
                id_usuario_bloqueo,
            } => self.block(id, reason, id_usuario_bloqueo).await,
            other => Ok(self
                .transition(id, &other, clock::now_local())
                .await?
                .into_turno()),
        }
    }

    /// Delete a turno that is not occupied and has no completado pago
    pub async fn delete(&self, id: TurnoId) -> TurnoResult<()> {
        self.store.delete_turno(id).await?;
        log::info!("Deleted turno {}", id);
        Ok(())
    }

    fn check_owner(turno: &Turno, id_cliente: ClienteId) -> TurnoResult<()> {
        if turno.estado != TurnoState::Reservado || turno.id_cliente != Some(id_cliente) {
            return Err(TurnoError::NotReservedBy {
                id: turno.id,
                id_cliente,
            });
        }
        Ok(())
    }
}
