//! Tariff resolver implementation.

use std::sync::Arc;

use chrono::{NaiveDateTime, Timelike};

use super::{
    errors::{TarifaError, TarifaResult},
    models::Quote,
};
use crate::catalog::{CanchaId, CatalogError, ServicioAdicional, Tarifa};
use crate::db::Store;

/// Minute of day from which lighting is charged (19:00)
pub const NIGHT_START_MINUTE: u32 = 19 * 60;

/// Minute of day until which lighting is charged (07:00)
pub const NIGHT_END_MINUTE: u32 = 7 * 60;

const SECONDS_PER_HOUR: i128 = 3600;

/// Whether an interval is charged for lighting.
///
/// Starts before 07:00, ends at or after 19:00, or crosses midnight.
pub fn needs_lighting(inicio: NaiveDateTime, fin: NaiveDateTime) -> bool {
    let start = inicio.hour() * 60 + inicio.minute();
    let end = fin.hour() * 60 + fin.minute();
    fin.date() > inicio.date() || start < NIGHT_END_MINUTE || end >= NIGHT_START_MINUTE
}

/// Prorate an hourly price over `seconds`, rounding half up to the nearest unit
pub fn prorate(precio_hora: i64, seconds: i64) -> TarifaResult<i64> {
    let raw = i128::from(precio_hora) * i128::from(seconds);
    let rounded = (raw + SECONDS_PER_HOUR / 2).div_euclid(SECONDS_PER_HOUR);
    i64::try_from(rounded).map_err(|_| TarifaError::Overflow)
}

/// Compute a quote from already-loaded catalog data.
///
/// # Arguments
///
/// * `id_cancha` - Court being priced
/// * `inicio` / `fin` - Half-open interval, facility-local
/// * `tarifa` - Court tariff, if one exists
/// * `servicios` - Add-on services; only active lighting services are considered
///
/// # Returns
///
/// * `TarifaResult<Quote>` - Quote, with a zero base when no tariff exists
pub fn quote(
    id_cancha: CanchaId,
    inicio: NaiveDateTime,
    fin: NaiveDateTime,
    tarifa: Option<&Tarifa>,
    servicios: &[ServicioAdicional],
) -> TarifaResult<Quote> {
    if id_cancha <= 0 {
        return Err(TarifaError::InvalidCancha(id_cancha));
    }
    if fin <= inicio {
        return Err(TarifaError::InvalidInterval { inicio, fin });
    }

    let seconds = (fin - inicio).num_seconds();
    let precio_hora = tarifa.map_or(0, |t| t.precio_hora);
    let precio_base = prorate(precio_hora, seconds)?;

    let luz = if needs_lighting(inicio, fin) {
        servicios
            .iter()
            .filter(|s| s.activo && s.es_luz())
            .max_by_key(|s| (s.precio_actual, -s.id))
    } else {
        None
    };

    let luz_monto = match luz {
        Some(servicio) => prorate(servicio.precio_actual, seconds)?,
        None => 0,
    };
    let precio_final = precio_base
        .checked_add(luz_monto)
        .ok_or(TarifaError::Overflow)?;

    Ok(Quote {
        id_cancha,
        fecha_hora_inicio: inicio,
        fecha_hora_fin: fin,
        duracion_minutos: (fin - inicio).num_minutes(),
        id_tarifa: tarifa.map(|t| t.id),
        precio_hora,
        precio_base,
        luz_aplicada: luz.is_some(),
        id_servicio_luz: luz.map(|s| s.id),
        luz_monto,
        precio_final,
    })
}

/// Loads tariffs and services from the store and prices intervals
#[derive(Clone)]
pub struct TariffResolver {
    store: Arc<dyn Store>,
}

impl TariffResolver {
    /// Create a new tariff resolver
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Quote a court for an interval.
    ///
    /// # Arguments
    ///
    /// * `id_cancha` - Court ID
    /// * `inicio` - Interval start (inclusive)
    /// * `fin` - Interval end (exclusive)
    ///
    /// # Returns
    ///
    /// * `TarifaResult<Quote>` - Quote or error
    ///
    /// # Errors
    ///
    /// * `TarifaError::InvalidCancha` - Non-positive court id
    /// * `TarifaError::InvalidInterval` - `fin <= inicio`
    /// * `TarifaError::Catalog` - Court does not exist or the store failed
    pub async fn quote(
        &self,
        id_cancha: CanchaId,
        inicio: NaiveDateTime,
        fin: NaiveDateTime,
    ) -> TarifaResult<Quote> {
        if id_cancha <= 0 {
            return Err(TarifaError::InvalidCancha(id_cancha));
        }
        if self.store.get_cancha(id_cancha).await?.is_none() {
            return Err(CatalogError::CanchaNotFound(id_cancha).into());
        }

        let tarifa = self.store.tarifa_for_cancha(id_cancha).await?;
        if tarifa.is_none() {
            log::warn!("Cancha {} has no tarifa, quoting base price 0", id_cancha);
        }
        let servicios = self.store.list_servicios().await?;

        let quote = quote(id_cancha, inicio, fin, tarifa.as_ref(), &servicios)?;
        log::debug!(
            "Quoted cancha {} {}..{}: base {} + luz {} = {}",
            id_cancha,
            inicio,
            fin,
            quote.precio_base,
            quote.luz_monto,
            quote.precio_final
        );
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn tarifa(precio_hora: i64) -> Tarifa {
        Tarifa {
            id: 1,
            id_cancha: 1,
            descripcion: None,
            precio_hora,
            created_at: Utc::now(),
        }
    }

    fn servicio(id: i64, nombre: &str, precio: i64, activo: bool) -> ServicioAdicional {
        ServicioAdicional {
            id,
            nombre: nombre.to_string(),
            precio_actual: precio,
            activo,
        }
    }

    #[test]
    fn test_night_window_boundaries() {
        assert!(!needs_lighting(at(10, 7, 0), at(10, 8, 0)));
        assert!(needs_lighting(at(10, 6, 59), at(10, 8, 0)));
        assert!(!needs_lighting(at(10, 17, 0), at(10, 18, 59)));
        assert!(needs_lighting(at(10, 18, 0), at(10, 19, 0)));
        assert!(needs_lighting(at(10, 23, 0), at(11, 1, 0)));
    }

    #[test]
    fn test_prorate_rounds_half_up() {
        assert_eq!(prorate(1000, 3600).unwrap(), 1000);
        assert_eq!(prorate(1000, 1800).unwrap(), 500);
        // 1001 * 0.5 = 500.5
        assert_eq!(prorate(1001, 1800).unwrap(), 501);
        // 1000 / 60 per minute = 16.67
        assert_eq!(prorate(1000, 60).unwrap(), 17);
        assert!(prorate(i64::MAX, 3600 * 4).is_err());
    }

    #[test]
    fn test_night_quote_adds_lighting() {
        let servicios = vec![servicio(1, "Luz", 300, true)];
        let q = quote(1, at(10, 20, 0), at(10, 21, 0), Some(&tarifa(1000)), &servicios).unwrap();
        assert_eq!(q.precio_base, 1000);
        assert!(q.luz_aplicada);
        assert_eq!(q.luz_monto, 300);
        assert_eq!(q.precio_final, 1300);
    }

    #[test]
    fn test_day_quote_has_no_lighting() {
        let servicios = vec![servicio(1, "Luz", 300, true)];
        let q = quote(1, at(10, 10, 0), at(10, 11, 0), Some(&tarifa(1000)), &servicios).unwrap();
        assert!(!q.luz_aplicada);
        assert_eq!(q.luz_monto, 0);
        assert_eq!(q.precio_final, 1000);
    }

    #[test]
    fn test_highest_active_lighting_service_wins() {
        let servicios = vec![
            servicio(1, "Luz básica", 200, true),
            servicio(2, "LUZ LED", 450, true),
            servicio(3, "Luz estadio", 900, false),
            servicio(4, "Pelotas", 5000, true),
        ];
        let q = quote(1, at(10, 20, 0), at(10, 21, 30), Some(&tarifa(1000)), &servicios).unwrap();
        assert_eq!(q.id_servicio_luz, Some(2));
        assert_eq!(q.luz_monto, 675);
        assert_eq!(q.precio_base, 1500);
        assert_eq!(q.precio_final, 2175);
    }

    #[test]
    fn test_missing_tariff_quotes_zero() {
        let q = quote(1, at(10, 10, 0), at(10, 11, 0), None, &[]).unwrap();
        assert_eq!(q.precio_final, 0);
        assert_eq!(q.id_tarifa, None);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(matches!(
            quote(0, at(10, 10, 0), at(10, 11, 0), None, &[]),
            Err(TarifaError::InvalidCancha(0))
        ));
        assert!(matches!(
            quote(1, at(10, 11, 0), at(10, 11, 0), None, &[]),
            Err(TarifaError::InvalidInterval { .. })
        ));
    }
}
