//! Background tasks.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use turnero::Engine;
use turnero::turno::TurnoId;

use crate::{logging, metrics};

/// Close every elapsed reservation once
pub async fn close_elapsed(engine: &Engine) -> Vec<TurnoId> {
    let start = Instant::now();
    let finished = match engine.turnos.finish_elapsed().await {
        Ok(finished) => finished,
        Err(e) => {
            tracing::error!(error = %e, "Closing elapsed turnos failed");
            return Vec::new();
        }
    };
    metrics::turnos_finalizados_total(finished.len());
    logging::log_performance(
        "finish_elapsed",
        start.elapsed().as_millis() as u64,
        Some(&format!("{} turnos finalizados", finished.len())),
    );
    finished
}

/// Spawn the periodic closure task.
///
/// The first run happens immediately; missed ticks are skipped rather than
/// replayed in a burst.
pub fn spawn_closure_task(engine: Engine, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(period_secs = period.as_secs(), "Closure task started");
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            close_elapsed(&engine).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, NaiveDate};
    use turnero::{BookingRequest, EngineConfig};
    use turnero::catalog::{NewCancha, NewCliente};
    use turnero::turno::{NewTurno, TurnoState};

    #[tokio::test]
    async fn test_close_elapsed_finishes_past_reservations() {
        let engine = Engine::in_memory(EngineConfig::default());
        let cancha = engine
            .catalog
            .create_cancha(NewCancha::new("Cancha 1"))
            .await
            .unwrap();
        let cliente = engine
            .catalog
            .create_cliente(NewCliente::new("Ana", "555-0101"))
            .await
            .unwrap();

        let inicio = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let turno = engine
            .turnos
            .create(NewTurno::new(cancha.id, inicio, inicio + ChronoDuration::hours(1)))
            .await
            .unwrap();
        engine
            .reservas
            .book(&BookingRequest {
                id_turno: turno.id,
                id_cliente: cliente.id,
                id_usuario_registro: None,
                metodo_pago: "efectivo".into(),
                id_gateway_externo: None,
                servicios: vec![],
            })
            .await
            .unwrap();

        assert_eq!(close_elapsed(&engine).await, vec![turno.id]);
        assert_eq!(
            engine.turnos.get(turno.id).await.unwrap().estado,
            TurnoState::Finalizado
        );
        assert!(close_elapsed(&engine).await.is_empty());
    }
}
