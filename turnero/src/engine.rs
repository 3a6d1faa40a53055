//! Engine wiring: every component over one shared store.

use std::sync::Arc;

use crate::booking::BookingFacade;
use crate::catalog::CatalogManager;
use crate::db::{Database, DatabaseConfig, MemoryStore, PgStore, Store};
use crate::equipo::TeamRoster;
use crate::pago::{LedgerConfig, PagoLedger};
use crate::pricing::TariffResolver;
use crate::torneo::TorneoAllocator;
use crate::turno::TurnoManager;

/// Engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub ledger: LedgerConfig,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self {
            ledger: LedgerConfig::from_env(),
        }
    }
}

/// All engine components sharing one storage backend
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn Store>,
    pub catalog: CatalogManager,
    pub tarifas: TariffResolver,
    pub turnos: TurnoManager,
    pub pagos: PagoLedger,
    pub torneos: TorneoAllocator,
    pub equipos: TeamRoster,
    pub reservas: BookingFacade,
}

impl Engine {
    /// Create an engine over an existing store
    pub fn new(store: Arc<dyn Store>, config: EngineConfig) -> Self {
        Self {
            catalog: CatalogManager::new(store.clone()),
            tarifas: TariffResolver::new(store.clone()),
            turnos: TurnoManager::new(store.clone()),
            pagos: PagoLedger::new(store.clone(), config.ledger.clone()),
            torneos: TorneoAllocator::new(store.clone()),
            equipos: TeamRoster::new(store.clone()),
            reservas: BookingFacade::new(store.clone(), config.ledger),
            store,
        }
    }

    /// Engine over a fresh in-memory store
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(Arc::new(MemoryStore::new()), config)
    }

    /// Connect to PostgreSQL, apply migrations and build the engine
    ///
    /// # Errors
    ///
    /// Returns the connection or migration error.
    pub async fn connect(
        db_config: &DatabaseConfig,
        config: EngineConfig,
    ) -> Result<Self, sqlx::Error> {
        let db = Database::new(db_config).await?;
        db.migrate().await?;
        log::info!("Database migrations applied");
        let store = PgStore::from_database(&db, db_config);
        Ok(Self::new(Arc::new(store), config))
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn health_check(&self) -> bool {
        self.store.health_check().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_engine_is_healthy() {
        let engine = Engine::in_memory(EngineConfig::default());
        assert_eq!(engine.backend(), "memory");
        assert!(engine.health_check().await);
        assert_eq!(
            engine.pagos.config().expiration,
            Some(chrono::Duration::minutes(30))
        );
    }
}
