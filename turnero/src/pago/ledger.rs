//! Payment ledger implementation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{
    errors::{PagoError, PagoResult},
    models::{Confirmation, LedgerConfig, NewPago, Pago, PagoFilter, PagoId},
};
use crate::catalog::ClienteId;
use crate::db::Store;
use crate::turno::TurnoId;

/// Ledger for manual and booking-linked payments
#[derive(Clone)]
pub struct PagoLedger {
    store: Arc<dyn Store>,
    config: LedgerConfig,
}

impl PagoLedger {
    /// Create a new ledger
    ///
    /// # Arguments
    ///
    /// * `store` - Storage backend
    /// * `config` - Expiry policy for `iniciado` pagos
    pub fn new(store: Arc<dyn Store>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Record a manual payment in `iniciado`
    ///
    /// # Errors
    ///
    /// * `PagoError::InvalidAmount` / `PagoError::AmountMismatch` - Bad amounts
    /// * `PagoError::ClienteNotFound` / `PagoError::TurnoNotFound` - Unknown references
    /// * `PagoError::TurnoAlreadyPaid` - The turno already has a completado pago
    pub async fn create(&self, nuevo: NewPago) -> PagoResult<Pago> {
        nuevo.total()?;
        let expires_at = self.config.expires_at(Utc::now());
        let pago = self.store.create_pago(&nuevo, expires_at).await?;
        log::info!(
            "Created pago {} for cliente {} (turno {:?}): total {}",
            pago.id,
            pago.id_cliente,
            pago.id_turno,
            pago.monto_total
        );
        Ok(pago)
    }

    pub async fn get(&self, id: PagoId) -> PagoResult<Pago> {
        self.store
            .get_pago(id)
            .await?
            .ok_or(PagoError::NotFound(id))
    }

    pub async fn list(&self, filter: &PagoFilter) -> PagoResult<Vec<Pago>> {
        self.store.list_pagos(filter).await
    }

    pub async fn list_by_cliente(&self, id_cliente: ClienteId) -> PagoResult<Vec<Pago>> {
        self.list(&PagoFilter {
            id_cliente: Some(id_cliente),
            ..Default::default()
        })
        .await
    }

    pub async fn list_by_turno(&self, id_turno: TurnoId) -> PagoResult<Vec<Pago>> {
        self.list(&PagoFilter {
            id_turno: Some(id_turno),
            ..Default::default()
        })
        .await
    }

    /// Confirm a pago.
    ///
    /// A pago linked to a turno reserves it in the same write; if the turno
    /// cannot be reserved the pago stays `iniciado`.
    ///
    /// # Errors
    ///
    /// * `PagoError::AlreadyProcessed` - Not `iniciado`
    /// * `PagoError::Expired` - Past `fecha_expiracion`
    /// * `PagoError::AmountMismatch` - Stored amounts do not add up
    /// * `PagoError::Reservation` - The linked turno could not be reserved
    pub async fn confirm(&self, id: PagoId, confirmation: &Confirmation) -> PagoResult<Pago> {
        self.confirm_at(id, confirmation, Utc::now()).await
    }

    pub async fn confirm_at(
        &self,
        id: PagoId,
        confirmation: &Confirmation,
        at: DateTime<Utc>,
    ) -> PagoResult<Pago> {
        match self.store.confirm_pago(id, confirmation, at).await {
            Ok(pago) => {
                log::info!("Pago {} completado (turno {:?})", id, pago.id_turno);
                Ok(pago)
            }
            Err(e) => {
                log::warn!("Pago {} confirmation rejected: {}", id, e);
                Err(e)
            }
        }
    }

    /// Mark an `iniciado` pago as `fallido`
    pub async fn mark_failed(&self, id: PagoId) -> PagoResult<Pago> {
        let pago = self.store.fail_pago(id).await?;
        log::info!("Pago {} fallido", id);
        Ok(pago)
    }

    /// Delete a pago unless it backs a live reservation
    pub async fn delete(&self, id: PagoId) -> PagoResult<()> {
        self.store.delete_pago(id).await?;
        log::info!("Deleted pago {}", id);
        Ok(())
    }
}
