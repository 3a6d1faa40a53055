//! Tournament allocator implementation.

use std::collections::HashSet;
use std::sync::Arc;

use super::{
    errors::{TorneoError, TorneoResult},
    models::{
        AssignOutcome, EnrollOutcome, Inscripcion, InscripcionFilter, InscripcionKey, NewTorneo,
        ReleaseOutcome, Torneo, TorneoId, TorneoRemoval, TorneoState, TorneoUpdate,
        WithdrawOutcome,
    },
    partido::{NewPartido, Partido, PartidoFilter, PartidoId, PartidoUpdate},
};
use crate::bulk::BulkReport;
use crate::catalog::UsuarioId;
use crate::clock;
use crate::db::Store;
use crate::equipo::EquipoId;
use crate::error::{DomainError, ErrorKind};
use crate::turno::{BlockReason, Change, Transition, Turno, TurnoFilter, TurnoId, TurnoManager};

/// Tournament allocator: court claims, enrollment and capacity
#[derive(Clone)]
pub struct TorneoAllocator {
    store: Arc<dyn Store>,
    turnos: TurnoManager,
}

impl TorneoAllocator {
    /// Create a new tournament allocator
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            turnos: TurnoManager::new(store.clone()),
            store,
        }
    }

    pub async fn create(&self, nuevo: NewTorneo) -> TorneoResult<Torneo> {
        nuevo.validate()?;
        let torneo = self.store.create_torneo(&nuevo).await?;
        log::info!(
            "Created torneo {} ({}), cupos {:?}",
            torneo.id,
            torneo.nombre,
            torneo.cupos
        );
        Ok(torneo)
    }

    pub async fn get(&self, id: TorneoId) -> TorneoResult<Torneo> {
        self.store
            .get_torneo(id)
            .await?
            .ok_or(TorneoError::NotFound(id))
    }

    pub async fn list(&self, estado: Option<TorneoState>) -> TorneoResult<Vec<Torneo>> {
        self.store.list_torneos(estado).await
    }

    /// Update a torneo; `cupos` may not drop below the enrolled count
    ///
    /// # Errors
    ///
    /// * `TorneoError::NotFound` - Unknown torneo
    /// * `TorneoError::InvalidField` - Resulting record fails validation
    /// * `TorneoError::CapacityBelowEnrolled` - Capacity reduced too far
    pub async fn update(&self, id: TorneoId, update: &TorneoUpdate) -> TorneoResult<Torneo> {
        let torneo = self.store.update_torneo(id, update).await?;
        log::info!("Updated torneo {}", id);
        Ok(torneo)
    }

    /// Delete a torneo, releasing its claimed turnos and dropping its enrollments
    pub async fn delete(&self, id: TorneoId) -> TorneoResult<TorneoRemoval> {
        let removal = self.store.delete_torneo(id).await?;
        log::info!(
            "Deleted torneo {}: released {} turnos, removed {} inscripciones and {} partidos",
            id,
            removal.turnos_liberados.len(),
            removal.inscripciones_eliminadas,
            removal.partidos_eliminados
        );
        Ok(removal)
    }

    /// Turnos currently claimed by the torneo
    pub async fn turnos_del_torneo(&self, id: TorneoId) -> TorneoResult<Vec<Turno>> {
        self.get(id).await?;
        let filter = TurnoFilter {
            id_torneo: Some(id),
            ..Default::default()
        };
        Ok(self.turnos.list(&filter).await?)
    }

    /// Claim turnos for a torneo, one at a time.
    ///
    /// Each turno is blocked with the torneo's tag. Turnos already claimed by
    /// this torneo report `YaAsignado`; reserved or foreign-claimed turnos are
    /// rejected individually.
    ///
    /// # Arguments
    ///
    /// * `id_torneo` - Claiming torneo
    /// * `ids_turnos` - Turnos to claim; duplicates are reported once
    /// * `id_usuario_bloqueo` - Operator performing the claim
    ///
    /// # Errors
    ///
    /// * `TorneoError::NotFound` - Unknown torneo
    pub async fn assign_turnos(
        &self,
        id_torneo: TorneoId,
        ids_turnos: &[TurnoId],
        id_usuario_bloqueo: Option<UsuarioId>,
    ) -> TorneoResult<BulkReport<TurnoId, AssignOutcome>> {
        self.get(id_torneo).await?;

        let block = Transition::Block {
            reason: BlockReason::Torneo(id_torneo),
            id_usuario_bloqueo,
        };
        let mut report = BulkReport::new();
        for id in unique(ids_turnos) {
            let outcome = match self.turnos.transition(id, &block, clock::now_local()).await {
                Ok(Change::Applied(_)) => AssignOutcome::Asignado,
                Ok(Change::Unchanged(_)) => AssignOutcome::YaAsignado,
                Err(e) if e.kind() == ErrorKind::Downstream => {
                    log::error!("Assigning turno {} to torneo {} failed: {}", id, id_torneo, e);
                    AssignOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
                Err(e) => AssignOutcome::Rechazado {
                    motivo: e.client_message(),
                },
            };
            report.push(id, outcome);
        }

        log::info!(
            "Torneo {} assign: {} asignados, {} ya asignados of {}",
            id_torneo,
            report.count(|o| matches!(o, AssignOutcome::Asignado)),
            report.count(|o| matches!(o, AssignOutcome::YaAsignado)),
            report.len()
        );
        Ok(report)
    }

    /// Release turnos claimed by a torneo, one at a time.
    ///
    /// Only this torneo's claims are released; anything else is rejected per
    /// item. Already `disponible` turnos report `YaDisponible`.
    pub async fn release_turnos(
        &self,
        id_torneo: TorneoId,
        ids_turnos: &[TurnoId],
    ) -> TorneoResult<BulkReport<TurnoId, ReleaseOutcome>> {
        self.get(id_torneo).await?;

        let release = Transition::Release {
            owner: Some(id_torneo),
        };
        let mut report = BulkReport::new();
        for id in unique(ids_turnos) {
            let outcome = match self
                .turnos
                .transition(id, &release, clock::now_local())
                .await
            {
                Ok(Change::Applied(_)) => ReleaseOutcome::Liberado,
                Ok(Change::Unchanged(_)) => ReleaseOutcome::YaDisponible,
                Err(e) if e.kind() == ErrorKind::Downstream => {
                    log::error!("Releasing turno {} from torneo {} failed: {}", id, id_torneo, e);
                    ReleaseOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
                Err(e) => ReleaseOutcome::Rechazado {
                    motivo: e.client_message(),
                },
            };
            report.push(id, outcome);
        }

        log::info!(
            "Torneo {} release: {} liberados of {}",
            id_torneo,
            report.count(|o| matches!(o, ReleaseOutcome::Liberado)),
            report.len()
        );
        Ok(report)
    }

    /// Enroll teams, one at a time, each atomically with the capacity check.
    ///
    /// # Errors
    ///
    /// * `TorneoError::NotFound` - Unknown torneo
    pub async fn enroll_teams(
        &self,
        id_torneo: TorneoId,
        ids_equipos: &[EquipoId],
    ) -> TorneoResult<BulkReport<EquipoId, EnrollOutcome>> {
        self.get(id_torneo).await?;

        let mut report = BulkReport::new();
        for id_equipo in unique(ids_equipos) {
            let outcome = match self.store.enroll_equipo(id_torneo, id_equipo).await {
                Ok(outcome) => outcome,
                Err(e) if e.kind() == ErrorKind::Downstream => {
                    log::error!(
                        "Enrolling equipo {} in torneo {} failed: {}",
                        id_equipo,
                        id_torneo,
                        e
                    );
                    EnrollOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
                Err(e) => EnrollOutcome::Rechazado {
                    motivo: e.client_message(),
                },
            };
            report.push(id_equipo, outcome);
        }

        log::info!(
            "Torneo {} enrollment: {} inscritos, {} sin cupo of {}",
            id_torneo,
            report.count(|o| matches!(o, EnrollOutcome::Inscrito)),
            report.count(|o| matches!(o, EnrollOutcome::SinCupo)),
            report.len()
        );
        Ok(report)
    }

    /// Withdraw (equipo, torneo) pairs; absent pairs report `NoInscrito`
    pub async fn withdraw_teams(
        &self,
        inscripciones: &[InscripcionKey],
    ) -> BulkReport<InscripcionKey, WithdrawOutcome> {
        let mut report = BulkReport::new();
        for key in unique(inscripciones) {
            let outcome = match self
                .store
                .withdraw_equipo(key.id_torneo, key.id_equipo)
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!(
                        "Withdrawing equipo {} from torneo {} failed: {}",
                        key.id_equipo,
                        key.id_torneo,
                        e
                    );
                    WithdrawOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
            };
            report.push(key, outcome);
        }
        log::info!(
            "Withdrew {} of {} inscripciones",
            report.count(|o| matches!(o, WithdrawOutcome::Retirado)),
            report.len()
        );
        report
    }

    /// Enroll a single team
    ///
    /// # Errors
    ///
    /// * `TorneoError::AlreadyEnrolled` - The pair exists
    /// * `TorneoError::Full` - No slots left
    /// * `TorneoError::Closed` - The torneo no longer accepts teams
    /// * `TorneoError::EquipoNotFound` - Unknown team
    pub async fn enroll(&self, id_torneo: TorneoId, id_equipo: EquipoId) -> TorneoResult<()> {
        let torneo = self.get(id_torneo).await?;
        match self.store.enroll_equipo(id_torneo, id_equipo).await? {
            EnrollOutcome::Inscrito => {
                log::info!("Equipo {} enrolled in torneo {}", id_equipo, id_torneo);
                Ok(())
            }
            EnrollOutcome::YaInscrito => Err(TorneoError::AlreadyEnrolled {
                id_equipo,
                id_torneo,
            }),
            EnrollOutcome::SinCupo => Err(TorneoError::Full {
                id: id_torneo,
                cupos: torneo.cupos.unwrap_or_default(),
            }),
            EnrollOutcome::NoEncontrado => Err(TorneoError::EquipoNotFound(id_equipo)),
            EnrollOutcome::Rechazado { .. } | EnrollOutcome::Fallido { .. } => {
                Err(TorneoError::Closed {
                    id: id_torneo,
                    estado: torneo.estado,
                })
            }
        }
    }

    /// Withdraw a single team
    pub async fn withdraw(&self, id_torneo: TorneoId, id_equipo: EquipoId) -> TorneoResult<()> {
        match self.store.withdraw_equipo(id_torneo, id_equipo).await? {
            WithdrawOutcome::Retirado => {
                log::info!("Equipo {} withdrawn from torneo {}", id_equipo, id_torneo);
                Ok(())
            }
            WithdrawOutcome::NoInscrito | WithdrawOutcome::Fallido { .. } => {
                Err(TorneoError::NotEnrolled {
                    id_equipo,
                    id_torneo,
                })
            }
        }
    }

    /// `max(cupos - enrolled, 0)`, or `None` when capacity is unlimited
    pub async fn remaining_slots(&self, id_torneo: TorneoId) -> TorneoResult<Option<i64>> {
        let torneo = self.get(id_torneo).await?;
        let enrolled = self.store.count_inscripciones(id_torneo).await?;
        Ok(torneo.remaining_slots(enrolled))
    }

    pub async fn enrolled_count(&self, id_torneo: TorneoId) -> TorneoResult<i64> {
        self.store.count_inscripciones(id_torneo).await
    }

    pub async fn inscripciones(&self, filter: &InscripcionFilter) -> TorneoResult<Vec<Inscripcion>> {
        self.store.list_inscripciones(filter).await
    }

    /// Schedule a partido
    ///
    /// # Errors
    ///
    /// * `TorneoError::NotFound` - Unknown torneo
    /// * `TorneoError::InvalidField` - Same team twice, foreign winner or negative score
    /// * `TorneoError::TurnoNotClaimed` - The turno is not blocked for this torneo
    /// * `TorneoError::TurnoInUse` - Another partido already uses the turno
    /// * `TorneoError::NotEnrolled` - A team is not enrolled in the torneo
    pub async fn create_partido(&self, nuevo: NewPartido) -> TorneoResult<Partido> {
        nuevo.clone().into_partido(0).validate()?;
        let partido = self.store.create_partido(&nuevo).await?;
        log::info!(
            "Created partido {} for torneo {} on turno {:?}",
            partido.id,
            partido.id_torneo,
            partido.id_turno
        );
        Ok(partido)
    }

    pub async fn get_partido(&self, id: PartidoId) -> TorneoResult<Partido> {
        self.store
            .get_partido(id)
            .await?
            .ok_or(TorneoError::PartidoNotFound(id))
    }

    pub async fn partidos(&self, filter: &PartidoFilter) -> TorneoResult<Vec<Partido>> {
        self.store.list_partidos(filter).await
    }

    /// Partidos of one torneo
    pub async fn partidos_del_torneo(&self, id: TorneoId) -> TorneoResult<Vec<Partido>> {
        self.get(id).await?;
        let filter = PartidoFilter {
            id_torneo: Some(id),
            ..Default::default()
        };
        self.store.list_partidos(&filter).await
    }

    /// Update a partido; a changed turno or team is checked as on creation
    pub async fn update_partido(
        &self,
        id: PartidoId,
        update: &PartidoUpdate,
    ) -> TorneoResult<Partido> {
        let partido = self.store.update_partido(id, update).await?;
        log::info!("Updated partido {} ({})", id, partido.estado);
        Ok(partido)
    }

    pub async fn delete_partido(&self, id: PartidoId) -> TorneoResult<()> {
        self.store.delete_partido(id).await?;
        log::info!("Deleted partido {}", id);
        Ok(())
    }
}

/// Input order with duplicates dropped
fn unique<T: Copy + Eq + std::hash::Hash>(items: &[T]) -> Vec<T> {
    let mut seen = HashSet::with_capacity(items.len());
    items.iter().copied().filter(|i| seen.insert(*i)).collect()
}
