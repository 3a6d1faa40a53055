//! Team roster implementation.

use std::collections::HashSet;
use std::sync::Arc;

use super::{
    errors::{EquipoError, EquipoResult},
    models::{
        Equipo, EquipoId, EquipoMiembro, MemberAddOutcome, MemberRemoveOutcome, NewEquipo,
    },
};
use crate::bulk::BulkReport;
use crate::catalog::ClienteId;
use crate::db::Store;
use crate::error::DomainError;

/// Team roster: teams and their members
#[derive(Clone)]
pub struct TeamRoster {
    store: Arc<dyn Store>,
}

impl TeamRoster {
    /// Create a new team roster
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Create a team
    ///
    /// # Errors
    ///
    /// * `EquipoError::InvalidName` - Blank name
    /// * `EquipoError::DuplicateName` - Another team already uses the name
    /// * `EquipoError::ClienteNotFound` - Unknown captain
    pub async fn create(&self, nuevo: NewEquipo) -> EquipoResult<Equipo> {
        nuevo.validate()?;
        let equipo = self.store.create_equipo(&nuevo).await?;
        log::info!("Created equipo {} ({})", equipo.id, equipo.nombre_equipo);
        Ok(equipo)
    }

    pub async fn get(&self, id: EquipoId) -> EquipoResult<Equipo> {
        self.store
            .get_equipo(id)
            .await?
            .ok_or(EquipoError::NotFound(id))
    }

    pub async fn list(&self) -> EquipoResult<Vec<Equipo>> {
        self.store.list_equipos().await
    }

    pub async fn list_miembros(&self, id_equipo: EquipoId) -> EquipoResult<Vec<EquipoMiembro>> {
        self.get(id_equipo).await?;
        self.store.list_miembros(id_equipo).await
    }

    /// Add members, one pair at a time.
    ///
    /// Present pairs report `YaMiembro`; nothing is duplicated.
    ///
    /// # Errors
    ///
    /// * `EquipoError::NotFound` - Unknown team
    pub async fn add_members(
        &self,
        id_equipo: EquipoId,
        ids_clientes: &[ClienteId],
    ) -> EquipoResult<BulkReport<ClienteId, MemberAddOutcome>> {
        self.get(id_equipo).await?;

        let mut report = BulkReport::new();
        let mut seen = HashSet::new();
        for &id_cliente in ids_clientes.iter().filter(|id| seen.insert(**id)) {
            let outcome = match self.store.add_miembro(id_equipo, id_cliente).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!(
                        "Adding cliente {} to equipo {} failed: {}",
                        id_cliente,
                        id_equipo,
                        e
                    );
                    MemberAddOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
            };
            report.push(id_cliente, outcome);
        }

        log::info!(
            "Equipo {} roster add: {} agregados of {}",
            id_equipo,
            report.count(|o| matches!(o, MemberAddOutcome::Agregado)),
            report.len()
        );
        Ok(report)
    }

    /// Remove members, one pair at a time; absent pairs report `NoMiembro`
    pub async fn remove_members(
        &self,
        id_equipo: EquipoId,
        ids_clientes: &[ClienteId],
    ) -> EquipoResult<BulkReport<ClienteId, MemberRemoveOutcome>> {
        self.get(id_equipo).await?;

        let mut report = BulkReport::new();
        let mut seen = HashSet::new();
        for &id_cliente in ids_clientes.iter().filter(|id| seen.insert(**id)) {
            let outcome = match self.store.remove_miembro(id_equipo, id_cliente).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!(
                        "Removing cliente {} from equipo {} failed: {}",
                        id_cliente,
                        id_equipo,
                        e
                    );
                    MemberRemoveOutcome::Fallido {
                        motivo: e.client_message(),
                    }
                }
            };
            report.push(id_cliente, outcome);
        }

        log::info!(
            "Equipo {} roster remove: {} eliminados of {}",
            id_equipo,
            report.count(|o| matches!(o, MemberRemoveOutcome::Eliminado)),
            report.len()
        );
        Ok(report)
    }

    /// Add a single member (`POST /equipo_miembros/`)
    ///
    /// # Errors
    ///
    /// * `EquipoError::NotFound` - Unknown team
    /// * `EquipoError::ClienteNotFound` - Unknown client
    pub async fn add_member(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberAddOutcome> {
        match self.store.add_miembro(id_equipo, id_cliente).await? {
            MemberAddOutcome::ClienteNoEncontrado => Err(EquipoError::ClienteNotFound(id_cliente)),
            outcome => Ok(outcome),
        }
    }

    /// Remove a single member; a no-op when the pair is absent
    pub async fn remove_member(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberRemoveOutcome> {
        self.store.remove_miembro(id_equipo, id_cliente).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::NewCliente;
    use crate::db::{CatalogRepository, MemoryStore};

    async fn setup() -> (TeamRoster, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (TeamRoster::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let (roster, _) = setup().await;
        let nuevo = NewEquipo {
            nombre_equipo: "Los Pumas".into(),
            id_capitan: None,
        };
        roster.create(nuevo.clone()).await.unwrap();
        assert!(matches!(
            roster.create(nuevo).await,
            Err(EquipoError::DuplicateName(_))
        ));
    }

    #[tokio::test]
    async fn test_bulk_add_reports_unknown_clients() {
        let (roster, store) = setup().await;
        let cliente = store
            .create_cliente(&NewCliente::new("Ana", "555-0101"))
            .await
            .unwrap();
        let equipo = roster
            .create(NewEquipo {
                nombre_equipo: "Los Pumas".into(),
                id_capitan: None,
            })
            .await
            .unwrap();

        let report = roster
            .add_members(equipo.id, &[cliente.id, 999, cliente.id])
            .await
            .unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.outcome_of(&cliente.id), Some(&MemberAddOutcome::Agregado));
        assert_eq!(
            report.outcome_of(&999),
            Some(&MemberAddOutcome::ClienteNoEncontrado)
        );

        assert!(matches!(
            roster.add_member(equipo.id, 999).await,
            Err(EquipoError::ClienteNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_unknown_team_is_not_found() {
        let (roster, _) = setup().await;
        assert!(matches!(
            roster.add_members(42, &[1]).await,
            Err(EquipoError::NotFound(42))
        ));
        assert!(matches!(
            roster.list_miembros(42).await,
            Err(EquipoError::NotFound(42))
        ));
    }
}
