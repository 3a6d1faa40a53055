//! Booking façade implementation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{
    errors::{BookingError, BookingResult},
    models::{Booking, BookingOrder, BookingRequest, BookingStep, ServiceRequest},
};
use crate::catalog::{CatalogError, ServicioId};
use crate::db::Store;
use crate::pago::{Confirmation, LedgerConfig, NewPago};
use crate::pricing::{Quote, TariffResolver};
use crate::turno::{TurnoError, TurnoId, TurnoServicio};

/// Prefix of gateway ids generated for simulated confirmations
pub const SIMULATED_GATEWAY_PREFIX: &str = "sim-";

/// Single entry point from turno selection to confirmed reservation
#[derive(Clone)]
pub struct BookingFacade {
    store: Arc<dyn Store>,
    resolver: TariffResolver,
    ledger: LedgerConfig,
}

impl BookingFacade {
    /// Create a new booking façade
    ///
    /// # Arguments
    ///
    /// * `store` - Storage backend performing the atomic write
    /// * `ledger` - Expiry policy stamped on the booking's pago
    pub fn new(store: Arc<dyn Store>, ledger: LedgerConfig) -> Self {
        Self {
            resolver: TariffResolver::new(store.clone()),
            store,
            ledger,
        }
    }

    /// Book a turno for a client.
    ///
    /// The price is always re-resolved; services are priced from the current
    /// catalog and frozen on the turno. The pago, its confirmation, the
    /// reservation and the services are written in one transaction.
    ///
    /// # Arguments
    ///
    /// * `request` - Turno, client, payment method and requested services
    ///
    /// # Returns
    ///
    /// * `BookingResult<Booking>` - Reserved turno, completado pago and quote
    ///
    /// # Errors
    ///
    /// Every error names the [`BookingStep`] that failed.
    pub async fn book(&self, request: &BookingRequest) -> BookingResult<Booking> {
        match self.try_book(request).await {
            Ok(booking) => {
                log::info!(
                    "Booked turno {} for cliente {}: pago {} total {}",
                    booking.turno.id,
                    request.id_cliente,
                    booking.pago.id,
                    booking.pago.monto_total
                );
                Ok(booking)
            }
            Err(e) => {
                log::warn!(
                    "Booking turno {} for cliente {} failed at {}: {}",
                    request.id_turno,
                    request.id_cliente,
                    e.step(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Price a booking without writing anything
    pub async fn prepare(&self, request: &BookingRequest) -> BookingResult<BookingOrder> {
        let metodo_pago = request.metodo_pago.trim();
        if metodo_pago.is_empty() {
            return Err(BookingError::InvalidRequest(
                "metodo_pago no puede estar vacío".to_string(),
            ));
        }

        if self
            .store
            .get_cliente(request.id_cliente)
            .await
            .map_err(catalog_error)?
            .is_none()
        {
            return Err(BookingError::ClienteNotFound(request.id_cliente));
        }

        let turno = self
            .store
            .get_turno(request.id_turno)
            .await
            .map_err(BookingError::Reservation)?
            .ok_or(BookingError::Reservation(TurnoError::NotFound(
                request.id_turno,
            )))?;

        let quote = self
            .resolver
            .quote(
                turno.id_cancha,
                turno.fecha_hora_inicio,
                turno.fecha_hora_fin,
            )
            .await
            .map_err(BookingError::Quote)?;

        let servicios = self
            .price_services(request.id_turno, &request.servicios, &quote)
            .await?;
        let monto_servicios = servicios.iter().try_fold(0i64, |acc, s| {
            s.subtotal()
                .and_then(|sub| acc.checked_add(sub))
                .ok_or(BookingError::Overflow)
        })?;
        let monto_total = quote
            .precio_final
            .checked_add(monto_servicios)
            .ok_or(BookingError::Overflow)?;

        let at = Utc::now();
        let id_gateway_externo = request
            .id_gateway_externo
            .clone()
            .unwrap_or_else(|| format!("{}{}", SIMULATED_GATEWAY_PREFIX, Uuid::new_v4()));

        Ok(BookingOrder {
            id_turno: request.id_turno,
            id_cliente: request.id_cliente,
            id_usuario_registro: request.id_usuario_registro,
            pago: NewPago {
                id_turno: Some(request.id_turno),
                monto_turno: quote.precio_final,
                monto_servicios,
                monto_total: Some(monto_total),
                id_cliente: request.id_cliente,
                id_usuario_registro: request.id_usuario_registro,
                metodo_pago: Some(metodo_pago.to_string()),
            },
            expires_at: self.ledger.expires_at(at),
            confirmation: Confirmation {
                metodo_pago: Some(metodo_pago.to_string()),
                id_gateway_externo: Some(id_gateway_externo),
            },
            quote,
            servicios,
            at,
        })
    }

    async fn try_book(&self, request: &BookingRequest) -> BookingResult<Booking> {
        let order = self.prepare(request).await?;
        let booked = self.store.book(&order).await?;
        Ok(Booking {
            turno: booked.turno,
            pago: booked.pago,
            cotizacion: order.quote,
            servicios: booked.servicios,
        })
    }

    /// Merge duplicate requests and freeze current catalog prices
    async fn price_services(
        &self,
        id_turno: TurnoId,
        requested: &[ServiceRequest],
        quote: &Quote,
    ) -> BookingResult<Vec<TurnoServicio>> {
        let mut merged: BTreeMap<ServicioId, i64> = BTreeMap::new();
        for item in requested {
            if item.cantidad <= 0 {
                return Err(BookingError::InvalidQuantity {
                    id_servicio: item.id_servicio,
                    cantidad: item.cantidad,
                });
            }
            let cantidad = merged.entry(item.id_servicio).or_insert(0);
            *cantidad = cantidad
                .checked_add(item.cantidad)
                .ok_or(BookingError::Overflow)?;
        }

        let mut servicios = Vec::with_capacity(merged.len());
        for (id_servicio, cantidad) in merged {
            let servicio = self
                .store
                .get_servicio(id_servicio)
                .await
                .map_err(catalog_error)?
                .ok_or(BookingError::ServicioNotFound(id_servicio))?;
            if !servicio.activo {
                return Err(BookingError::ServicioInactive {
                    id: servicio.id,
                    nombre: servicio.nombre,
                });
            }
            if quote.luz_aplicada && servicio.es_luz() {
                return Err(BookingError::LightingAlreadyCharged(servicio.id));
            }
            servicios.push(TurnoServicio {
                id_turno,
                id_servicio,
                cantidad,
                precio_unitario_congelado: servicio.precio_actual,
            });
        }
        Ok(servicios)
    }
}

fn catalog_error(err: CatalogError) -> BookingError {
    match err {
        CatalogError::Database(source) => BookingError::database(BookingStep::Validacion, source),
        CatalogError::Timeout(duration) => BookingError::Timeout {
            step: BookingStep::Validacion,
            duration,
        },
        other => BookingError::Catalog(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{NewCancha, NewCliente, NewServicio, NewTarifa};
    use crate::db::{CatalogRepository, MemoryStore, PagoRepository, TurnoRepository};
    use crate::error::{DomainError, ErrorKind};
    use crate::pago::PagoState;
    use crate::turno::{NewTurno, TurnoState};
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2099, 6, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    struct Fixture {
        store: Arc<MemoryStore>,
        facade: BookingFacade,
        id_cliente: i64,
        id_pelota: i64,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let cancha = store.create_cancha(&NewCancha::new("Cancha 1")).await.unwrap();
        store
            .create_tarifa(&NewTarifa {
                id_cancha: cancha.id,
                descripcion: None,
                precio_hora: 1000,
            })
            .await
            .unwrap();
        store
            .create_servicio(&NewServicio {
                nombre: "Luz".into(),
                precio_actual: 300,
                activo: true,
            })
            .await
            .unwrap();
        let pelota = store
            .create_servicio(&NewServicio {
                nombre: "Pelota".into(),
                precio_actual: 150,
                activo: true,
            })
            .await
            .unwrap();
        let cliente = store
            .create_cliente(&NewCliente::new("Ana", "555-0101"))
            .await
            .unwrap();
        for (inicio, fin) in [(10, 11), (20, 21)] {
            store
                .create_turno(&NewTurno::new(cancha.id, at(inicio), at(fin)), 0)
                .await
                .unwrap();
        }
        Fixture {
            facade: BookingFacade::new(store.clone(), LedgerConfig::default()),
            store,
            id_cliente: cliente.id,
            id_pelota: pelota.id,
        }
    }

    fn request(id_turno: TurnoId, id_cliente: i64, servicios: Vec<ServiceRequest>) -> BookingRequest {
        BookingRequest {
            id_turno,
            id_cliente,
            id_usuario_registro: None,
            metodo_pago: "efectivo".into(),
            id_gateway_externo: None,
            servicios,
        }
    }

    #[tokio::test]
    async fn test_night_booking_prices_lighting_and_services() {
        let f = fixture().await;
        let booking = f
            .facade
            .book(&request(
                2,
                f.id_cliente,
                vec![
                    ServiceRequest {
                        id_servicio: f.id_pelota,
                        cantidad: 1,
                    },
                    ServiceRequest {
                        id_servicio: f.id_pelota,
                        cantidad: 2,
                    },
                ],
            ))
            .await
            .unwrap();

        assert_eq!(booking.cotizacion.precio_final, 1300);
        assert_eq!(booking.turno.estado, TurnoState::Reservado);
        assert_eq!(booking.turno.precio_final, 1300);
        assert_eq!(booking.servicios.len(), 1);
        assert_eq!(booking.servicios[0].cantidad, 3);
        assert_eq!(booking.pago.monto_servicios, 450);
        assert_eq!(booking.pago.monto_total, 1750);
        assert_eq!(booking.pago.estado, PagoState::Completado);
        assert!(
            booking
                .pago
                .id_gateway_externo
                .as_deref()
                .is_some_and(|g| g.starts_with(SIMULATED_GATEWAY_PREFIX))
        );
    }

    #[tokio::test]
    async fn test_second_booking_conflicts() {
        let f = fixture().await;
        f.facade
            .book(&request(1, f.id_cliente, vec![]))
            .await
            .unwrap();
        let err = f
            .facade
            .book(&request(1, f.id_cliente, vec![]))
            .await
            .unwrap_err();
        assert_eq!(err.step(), BookingStep::Reserva);
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_lighting_cannot_be_added_twice() {
        let f = fixture().await;
        let err = f
            .facade
            .book(&request(
                2,
                f.id_cliente,
                vec![ServiceRequest {
                    id_servicio: 1,
                    cantidad: 1,
                }],
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::LightingAlreadyCharged(1)));
        let turno = f.store.get_turno(2).await.unwrap().unwrap();
        assert_eq!(turno.estado, TurnoState::Disponible);
    }

    #[tokio::test]
    async fn test_invalid_requests_rejected_before_writing() {
        let f = fixture().await;
        let mut blank = request(1, f.id_cliente, vec![]);
        blank.metodo_pago = "  ".into();
        assert!(matches!(
            f.facade.book(&blank).await,
            Err(BookingError::InvalidRequest(_))
        ));
        assert!(matches!(
            f.facade.book(&request(1, 77, vec![])).await,
            Err(BookingError::ClienteNotFound(77))
        ));
        let err = f
            .facade
            .book(&request(
                1,
                f.id_cliente,
                vec![ServiceRequest {
                    id_servicio: f.id_pelota,
                    cantidad: 0,
                }],
            ))
            .await
            .unwrap_err();
        assert_eq!(err.step(), BookingStep::Validacion);
        assert!(f.store.list_pagos(&Default::default()).await.unwrap().is_empty());
    }
}
