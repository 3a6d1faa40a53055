//! Integration tests for the booking façade and the payment ledger.
//!
//! A booking either produces a reserved turno backed by a completado pago,
//! or leaves nothing behind.

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use turnero::booking::{BookingError, BookingStep, ServiceRequest};
use turnero::catalog::{NewCancha, NewCliente, NewServicio, NewTarifa};
use turnero::error::{DomainError, ErrorKind};
use turnero::pago::{Confirmation, NewPago, PagoError, PagoFilter, PagoState};
use turnero::pricing::needs_lighting;
use turnero::torneo::{AssignOutcome, NewTorneo};
use turnero::turno::{NewTurno, TurnoError, TurnoState};
use turnero::{BookingRequest, Engine, EngineConfig};

fn at(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2099, 3, 10)
        .unwrap()
        .and_hms_opt(h, m, 0)
        .unwrap()
}

struct Facility {
    engine: Engine,
    cancha: i64,
    cliente: i64,
    pelotas: i64,
}

async fn facility() -> Facility {
    let engine = Engine::in_memory(EngineConfig::default());
    let cancha = engine
        .catalog
        .create_cancha(NewCancha::new("Cancha central"))
        .await
        .unwrap();
    engine
        .catalog
        .create_tarifa(NewTarifa {
            id_cancha: cancha.id,
            descripcion: None,
            precio_hora: 1000,
        })
        .await
        .unwrap();
    engine
        .catalog
        .create_servicio(NewServicio {
            nombre: "Luz".into(),
            precio_actual: 300,
            activo: true,
        })
        .await
        .unwrap();
    let pelotas = engine
        .catalog
        .create_servicio(NewServicio {
            nombre: "Pelotas".into(),
            precio_actual: 200,
            activo: true,
        })
        .await
        .unwrap();
    let cliente = engine
        .catalog
        .create_cliente(NewCliente::new("Ana", "555-0101"))
        .await
        .unwrap();
    Facility {
        engine,
        cancha: cancha.id,
        cliente: cliente.id,
        pelotas: pelotas.id,
    }
}

fn request(id_turno: i64, id_cliente: i64) -> BookingRequest {
    BookingRequest {
        id_turno,
        id_cliente,
        id_usuario_registro: Some(3),
        metodo_pago: "tarjeta".into(),
        id_gateway_externo: Some("mp-001".into()),
        servicios: vec![],
    }
}

#[tokio::test]
async fn test_price_examples() {
    let f = facility().await;
    let noche = f
        .engine
        .tarifas
        .quote(f.cancha, at(20, 0), at(21, 0))
        .await
        .unwrap();
    assert_eq!(noche.precio_final, 1300);
    assert!(noche.luz_aplicada);
    assert_eq!(noche.luz_monto, 300);

    let dia = f
        .engine
        .tarifas
        .quote(f.cancha, at(10, 0), at(11, 0))
        .await
        .unwrap();
    assert_eq!(dia.precio_final, 1000);
    assert!(!dia.luz_aplicada);

    assert!(needs_lighting(at(23, 0), at(23, 0) + Duration::hours(2)));
}

#[tokio::test]
async fn test_quote_without_tariff_is_zero() {
    let f = facility().await;
    let sin_tarifa = f
        .engine
        .catalog
        .create_cancha(NewCancha::new("Cancha 2"))
        .await
        .unwrap();
    let q = f
        .engine
        .tarifas
        .quote(sin_tarifa.id, at(10, 0), at(11, 0))
        .await
        .unwrap();
    assert_eq!(q.precio_base, 0);
    assert_eq!(q.id_tarifa, None);
}

#[tokio::test]
async fn test_booking_writes_every_record() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(20, 0), at(21, 30)))
        .await
        .unwrap();

    let mut req = request(turno.id, f.cliente);
    req.servicios = vec![ServiceRequest {
        id_servicio: f.pelotas,
        cantidad: 2,
    }];
    let booking = f.engine.reservas.book(&req).await.unwrap();

    // 1.5 h at 1000 plus 1.5 h of lighting at 300
    assert_eq!(booking.cotizacion.precio_base, 1500);
    assert_eq!(booking.cotizacion.luz_monto, 450);
    assert_eq!(booking.turno.precio_final, 1950);
    assert_eq!(booking.turno.estado, TurnoState::Reservado);
    assert_eq!(booking.turno.id_cliente, Some(f.cliente));
    assert_eq!(booking.turno.id_usuario_registro, Some(3));

    assert_eq!(booking.pago.estado, PagoState::Completado);
    assert_eq!(booking.pago.monto_turno, 1950);
    assert_eq!(booking.pago.monto_servicios, 400);
    assert_eq!(booking.pago.monto_total, 2350);
    assert_eq!(booking.pago.id_gateway_externo.as_deref(), Some("mp-001"));
    assert!(booking.pago.fecha_completado.is_some());

    let total = f.engine.turnos.precio_total(turno.id).await.unwrap();
    assert_eq!(total.total_servicios, 400);
    assert_eq!(total.precio_total, 2350);

    let servicios = f.engine.turnos.servicios(turno.id).await.unwrap();
    assert_eq!(servicios.len(), 1);
    assert_eq!(servicios[0].precio_unitario_congelado, 200);
}

#[tokio::test]
async fn test_frozen_service_price_survives_catalog_change() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();
    let mut req = request(turno.id, f.cliente);
    req.servicios = vec![ServiceRequest {
        id_servicio: f.pelotas,
        cantidad: 1,
    }];
    f.engine.reservas.book(&req).await.unwrap();

    f.engine
        .catalog
        .set_servicio_activo(f.pelotas, false)
        .await
        .unwrap();
    let total = f.engine.turnos.precio_total(turno.id).await.unwrap();
    assert_eq!(total.precio_total, 1200);
}

#[tokio::test]
async fn test_failed_booking_leaves_no_records() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();
    f.engine
        .catalog
        .set_servicio_activo(f.pelotas, false)
        .await
        .unwrap();

    let mut req = request(turno.id, f.cliente);
    req.servicios = vec![ServiceRequest {
        id_servicio: f.pelotas,
        cantidad: 1,
    }];
    let err = f.engine.reservas.book(&req).await.unwrap_err();
    assert!(matches!(err, BookingError::ServicioInactive { .. }));
    assert_eq!(err.step(), BookingStep::Validacion);

    assert!(f.engine.pagos.list(&PagoFilter::default()).await.unwrap().is_empty());
    let turno = f.engine.turnos.get(turno.id).await.unwrap();
    assert_eq!(turno.estado, TurnoState::Disponible);
    assert!(f.engine.turnos.servicios(turno.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let f = facility().await;
    let otro = f
        .engine
        .catalog
        .create_cliente(NewCliente::new("Luis", "555-0102"))
        .await
        .unwrap();
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();

    f.engine
        .reservas
        .book(&request(turno.id, f.cliente))
        .await
        .unwrap();
    let err = f
        .engine
        .reservas
        .book(&request(turno.id, otro.id))
        .await
        .unwrap_err();
    assert_eq!(err.step(), BookingStep::Reserva);
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(
        err,
        BookingError::Reservation(TurnoError::NotAvailable { .. })
    ));

    let pagos = f.engine.pagos.list_by_turno(turno.id).await.unwrap();
    assert_eq!(pagos.len(), 1);
    assert_eq!(pagos[0].id_cliente, f.cliente);
}

#[tokio::test]
async fn test_booking_blocked_turno_rejected() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();
    f.engine
        .turnos
        .block(
            turno.id,
            turnero::turno::BlockReason::admin("Mantenimiento").unwrap(),
            None,
        )
        .await
        .unwrap();
    let err = f
        .engine
        .reservas
        .book(&request(turno.id, f.cliente))
        .await
        .unwrap_err();
    assert_eq!(err.step(), BookingStep::Reserva);
    assert!(err.client_message().contains("no está disponible"));
}

#[tokio::test]
async fn test_manual_payment_confirm_reserves_turno() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();

    let pago = f
        .engine
        .pagos
        .create(NewPago {
            id_turno: Some(turno.id),
            monto_turno: 1000,
            monto_servicios: 0,
            monto_total: None,
            id_cliente: f.cliente,
            id_usuario_registro: None,
            metodo_pago: Some("efectivo".into()),
        })
        .await
        .unwrap();
    assert_eq!(pago.estado, PagoState::Iniciado);
    assert!(pago.fecha_expiracion.is_some());

    let done = f
        .engine
        .pagos
        .confirm(pago.id, &Confirmation::default())
        .await
        .unwrap();
    assert_eq!(done.estado, PagoState::Completado);
    let turno = f.engine.turnos.get(turno.id).await.unwrap();
    assert_eq!(turno.estado, TurnoState::Reservado);
    assert_eq!(turno.id_cliente, Some(f.cliente));

    assert!(matches!(
        f.engine.pagos.confirm(pago.id, &Confirmation::default()).await,
        Err(PagoError::AlreadyProcessed { .. })
    ));
    assert!(matches!(
        f.engine.pagos.delete(pago.id).await,
        Err(PagoError::BacksReservation { .. })
    ));
}

#[tokio::test]
async fn test_confirm_fails_when_turno_taken() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(10, 0), at(11, 0)))
        .await
        .unwrap();
    let pago = f
        .engine
        .pagos
        .create(NewPago {
            id_turno: Some(turno.id),
            monto_turno: 1000,
            monto_servicios: 0,
            monto_total: Some(1000),
            id_cliente: f.cliente,
            id_usuario_registro: None,
            metodo_pago: None,
        })
        .await
        .unwrap();
    f.engine
        .turnos
        .block(
            turno.id,
            turnero::turno::BlockReason::admin("Lluvia").unwrap(),
            None,
        )
        .await
        .unwrap();

    let err = f
        .engine
        .pagos
        .confirm(pago.id, &Confirmation::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PagoError::Reservation(_)));
    assert_eq!(
        f.engine.pagos.get(pago.id).await.unwrap().estado,
        PagoState::Iniciado
    );

    let failed = f.engine.pagos.mark_failed(pago.id).await.unwrap();
    assert_eq!(failed.estado, PagoState::Fallido);
    assert!(matches!(
        f.engine.pagos.mark_failed(pago.id).await,
        Err(PagoError::AlreadyProcessed { .. })
    ));
    f.engine.pagos.delete(pago.id).await.unwrap();
}

#[tokio::test]
async fn test_expired_payment_cannot_be_confirmed() {
    let f = facility().await;
    let pago = f
        .engine
        .pagos
        .create(NewPago {
            id_turno: None,
            monto_turno: 500,
            monto_servicios: 0,
            monto_total: None,
            id_cliente: f.cliente,
            id_usuario_registro: None,
            metodo_pago: None,
        })
        .await
        .unwrap();
    let later = Utc::now() + Duration::hours(1);
    assert!(matches!(
        f.engine
            .pagos
            .confirm_at(pago.id, &Confirmation::default(), later)
            .await,
        Err(PagoError::Expired(_))
    ));
}

#[tokio::test]
async fn test_payment_amounts_validated() {
    let f = facility().await;
    let err = f
        .engine
        .pagos
        .create(NewPago {
            id_turno: None,
            monto_turno: 1000,
            monto_servicios: 200,
            monto_total: Some(1000),
            id_cliente: f.cliente,
            id_usuario_registro: None,
            metodo_pago: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, PagoError::AmountMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(matches!(
        f.engine
            .pagos
            .create(NewPago {
                id_turno: None,
                monto_turno: 1000,
                monto_servicios: 0,
                monto_total: None,
                id_cliente: 999,
                id_usuario_registro: None,
                metodo_pago: None,
            })
            .await,
        Err(PagoError::ClienteNotFound(999))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_single_winner() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(15, 0), at(16, 0)))
        .await
        .unwrap();
    let mut clientes = vec![f.cliente];
    for i in 0..7 {
        let cliente = f
            .engine
            .catalog
            .create_cliente(NewCliente::new(format!("Cliente {i}"), format!("555-02{i:02}")))
            .await
            .unwrap();
        clientes.push(cliente.id);
    }

    let id_turno = turno.id;
    let mut handles = Vec::new();
    for id_cliente in clientes {
        let engine = f.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.reservas.book(&request(id_turno, id_cliente)).await
        }));
    }
    let mut winners = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(records) => winners.push(records),
            Err(e) => assert_eq!(e.kind(), ErrorKind::Conflict, "{e}"),
        }
    }
    assert_eq!(winners.len(), 1);

    // One completado pago, owned by the reserving client
    let stored = f.engine.turnos.get(turno.id).await.unwrap();
    assert_eq!(stored.estado, TurnoState::Reservado);
    let completados: Vec<_> = f
        .engine
        .pagos
        .list_by_turno(turno.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.estado == PagoState::Completado)
        .collect();
    assert_eq!(completados.len(), 1);
    assert_eq!(Some(completados[0].id_cliente), stored.id_cliente);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tournament_claims_single_winner() {
    let f = facility().await;
    let turno = f
        .engine
        .turnos
        .create(NewTurno::new(f.cancha, at(17, 0), at(18, 0)))
        .await
        .unwrap();
    let mut torneos = Vec::new();
    for nombre in ["Apertura", "Clausura"] {
        let torneo = f
            .engine
            .torneos
            .create(NewTorneo::new(nombre, "futbol"))
            .await
            .unwrap();
        torneos.push(torneo.id);
    }

    let id_turno = turno.id;
    let mut handles = Vec::new();
    for id_torneo in torneos {
        let engine = f.engine.clone();
        handles.push(tokio::spawn(async move {
            let report = engine
                .torneos
                .assign_turnos(id_torneo, &[id_turno], None)
                .await
                .unwrap();
            (id_torneo, report.outcome_of(&id_turno).cloned())
        }));
    }
    let mut ganadores = Vec::new();
    for handle in handles {
        let (id_torneo, outcome) = handle.await.unwrap();
        match outcome {
            Some(AssignOutcome::Asignado) => ganadores.push(id_torneo),
            Some(AssignOutcome::Rechazado { .. }) => {}
            other => panic!("unexpected outcome for torneo {id_torneo}: {other:?}"),
        }
    }
    assert_eq!(ganadores.len(), 1);

    let stored = f.engine.turnos.get(turno.id).await.unwrap();
    assert_eq!(stored.estado, TurnoState::Bloqueado);
    assert_eq!(stored.id_torneo_bloqueo, Some(ganadores[0]));
}
