//! Catalog manager implementation.

use std::sync::Arc;

use super::{
    errors::{CatalogError, CatalogResult},
    models::{
        Cancha, CanchaId, Cliente, ClienteId, NewCancha, NewCliente, NewServicio, NewTarifa,
        ServicioAdicional, ServicioId, Tarifa,
    },
};
use crate::db::Store;

/// Catalog manager for courts, tariffs, services and clients
#[derive(Clone)]
pub struct CatalogManager {
    store: Arc<dyn Store>,
}

impl CatalogManager {
    /// Create a new catalog manager
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create_cancha(&self, nueva: NewCancha) -> CatalogResult<Cancha> {
        nueva.validate()?;
        let cancha = self.store.create_cancha(&nueva).await?;
        log::info!("Created cancha {} ({})", cancha.id, cancha.nombre);
        Ok(cancha)
    }

    /// Get a court by ID
    ///
    /// # Errors
    ///
    /// * `CatalogError::CanchaNotFound` - Unknown court
    pub async fn get_cancha(&self, id: CanchaId) -> CatalogResult<Cancha> {
        self.store
            .get_cancha(id)
            .await?
            .ok_or(CatalogError::CanchaNotFound(id))
    }

    pub async fn list_canchas(&self) -> CatalogResult<Vec<Cancha>> {
        self.store.list_canchas().await
    }

    /// Create a tariff for a court.
    ///
    /// The newest tariff of a court is the one applied at booking time.
    ///
    /// # Errors
    ///
    /// * `CatalogError::InvalidPrice` - Negative hourly price
    /// * `CatalogError::CanchaNotFound` - Unknown court
    pub async fn create_tarifa(&self, nueva: NewTarifa) -> CatalogResult<Tarifa> {
        nueva.validate()?;
        let tarifa = self.store.create_tarifa(&nueva).await?;
        log::info!(
            "Created tarifa {} for cancha {}: {}/h",
            tarifa.id,
            tarifa.id_cancha,
            tarifa.precio_hora
        );
        Ok(tarifa)
    }

    pub async fn tarifa_for_cancha(&self, id_cancha: CanchaId) -> CatalogResult<Option<Tarifa>> {
        self.store.tarifa_for_cancha(id_cancha).await
    }

    pub async fn list_tarifas(&self) -> CatalogResult<Vec<Tarifa>> {
        self.store.list_tarifas().await
    }

    pub async fn create_servicio(&self, nuevo: NewServicio) -> CatalogResult<ServicioAdicional> {
        nuevo.validate()?;
        let servicio = self.store.create_servicio(&nuevo).await?;
        log::info!("Created servicio {} ({})", servicio.id, servicio.nombre);
        Ok(servicio)
    }

    pub async fn get_servicio(&self, id: ServicioId) -> CatalogResult<ServicioAdicional> {
        self.store
            .get_servicio(id)
            .await?
            .ok_or(CatalogError::ServicioNotFound(id))
    }

    pub async fn list_servicios(&self) -> CatalogResult<Vec<ServicioAdicional>> {
        self.store.list_servicios().await
    }

    /// Activate or deactivate a service; inactive services cannot be booked
    pub async fn set_servicio_activo(
        &self,
        id: ServicioId,
        activo: bool,
    ) -> CatalogResult<ServicioAdicional> {
        let servicio = self.store.set_servicio_activo(id, activo).await?;
        log::info!("Servicio {} activo = {}", id, activo);
        Ok(servicio)
    }

    pub async fn create_cliente(&self, nuevo: NewCliente) -> CatalogResult<Cliente> {
        nuevo.validate()?;
        let cliente = self.store.create_cliente(&nuevo).await?;
        log::info!("Created cliente {}", cliente.id);
        Ok(cliente)
    }

    pub async fn get_cliente(&self, id: ClienteId) -> CatalogResult<Cliente> {
        self.store
            .get_cliente(id)
            .await?
            .ok_or(CatalogError::ClienteNotFound(id))
    }

    pub async fn list_clientes(&self) -> CatalogResult<Vec<Cliente>> {
        self.store.list_clientes().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager() -> CatalogManager {
        CatalogManager::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_tarifa_requires_cancha() {
        let catalog = manager();
        let err = catalog
            .create_tarifa(NewTarifa {
                id_cancha: 42,
                descripcion: None,
                precio_hora: 1000,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::CanchaNotFound(42)));
    }

    #[tokio::test]
    async fn test_servicio_toggle() {
        let catalog = manager();
        let servicio = catalog
            .create_servicio(NewServicio {
                nombre: "Pelota".into(),
                precio_actual: 200,
                activo: true,
            })
            .await
            .unwrap();
        let off = catalog.set_servicio_activo(servicio.id, false).await.unwrap();
        assert!(!off.activo);
        assert!(!catalog.get_servicio(servicio.id).await.unwrap().activo);
        assert!(matches!(
            catalog.set_servicio_activo(99, true).await,
            Err(CatalogError::ServicioNotFound(99))
        ));
    }

    #[tokio::test]
    async fn test_missing_cliente() {
        assert!(matches!(
            manager().get_cliente(5).await,
            Err(CatalogError::ClienteNotFound(5))
        ));
    }
}
