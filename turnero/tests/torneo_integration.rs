//! Integration tests for tournaments: turno claims, capacity-checked
//! enrollment, partidos and the delete cascade.

use chrono::{NaiveDate, NaiveDateTime};
use turnero::catalog::{NewCancha, NewCliente, NewTarifa};
use turnero::equipo::{EquipoId, NewEquipo};
use turnero::torneo::{
    AssignOutcome, EnrollOutcome, InscripcionFilter, InscripcionKey, NewPartido, NewTorneo,
    PartidoFilter, PartidoState, PartidoUpdate, ReleaseOutcome, TorneoError, TorneoState,
    TorneoUpdate, WithdrawOutcome,
};
use turnero::turno::{
    BlockReason, NewTurno, Transition, Turno, TurnoError, TurnoState, torneo_tag,
};
use turnero::{BookingRequest, Engine, EngineConfig};

fn at(h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2099, 9, 1)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

async fn setup() -> (Engine, i64) {
    let engine = Engine::in_memory(EngineConfig::default());
    let cancha = engine
        .catalog
        .create_cancha(NewCancha::new("Cancha 1"))
        .await
        .unwrap();
    engine
        .catalog
        .create_tarifa(NewTarifa {
            id_cancha: cancha.id,
            descripcion: None,
            precio_hora: 800,
        })
        .await
        .unwrap();
    (engine, cancha.id)
}

async fn turnos(engine: &Engine, id_cancha: i64, hours: &[u32]) -> Vec<Turno> {
    let mut out = Vec::new();
    for &h in hours {
        out.push(
            engine
                .turnos
                .create(NewTurno::new(id_cancha, at(h), at(h + 1)))
                .await
                .unwrap(),
        );
    }
    out
}

async fn equipos(engine: &Engine, names: &[&str]) -> Vec<EquipoId> {
    let mut out = Vec::new();
    for name in names {
        let equipo = engine
            .equipos
            .create(NewEquipo {
                nombre_equipo: name.to_string(),
                id_capitan: None,
            })
            .await
            .unwrap();
        out.push(equipo.id);
    }
    out
}

#[tokio::test]
async fn test_assign_tags_and_reports_per_item() {
    let (engine, cancha) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9, 10, 11]).await;

    // A client holds the 11:00 slot
    let cliente = engine
        .catalog
        .create_cliente(NewCliente::new("Ana", "555-0101"))
        .await
        .unwrap();
    engine
        .reservas
        .book(&BookingRequest {
            id_turno: ts[2].id,
            id_cliente: cliente.id,
            id_usuario_registro: None,
            metodo_pago: "efectivo".into(),
            id_gateway_externo: None,
            servicios: vec![],
        })
        .await
        .unwrap();

    let report = engine
        .torneos
        .assign_turnos(torneo.id, &[ts[0].id, ts[1].id, ts[2].id, 999], Some(5))
        .await
        .unwrap();
    assert_eq!(report.len(), 4);
    assert_eq!(report.outcome_of(&ts[0].id), Some(&AssignOutcome::Asignado));
    assert_eq!(report.outcome_of(&ts[1].id), Some(&AssignOutcome::Asignado));
    assert!(matches!(
        report.outcome_of(&ts[2].id),
        Some(AssignOutcome::Rechazado { .. })
    ));
    assert!(matches!(
        report.outcome_of(&999),
        Some(AssignOutcome::Rechazado { .. })
    ));

    let claimed = engine.turnos.get(ts[0].id).await.unwrap();
    assert_eq!(claimed.estado, TurnoState::Bloqueado);
    assert_eq!(claimed.motivo_bloqueo, Some(torneo_tag(torneo.id)));
    assert_eq!(claimed.id_torneo_bloqueo, Some(torneo.id));
    assert_eq!(claimed.id_usuario_bloqueo, Some(5));

    // Re-assigning is idempotent
    let again = engine
        .torneos
        .assign_turnos(torneo.id, &[ts[0].id], Some(5))
        .await
        .unwrap();
    assert_eq!(again.outcome_of(&ts[0].id), Some(&AssignOutcome::YaAsignado));

    let del_torneo = engine.torneos.turnos_del_torneo(torneo.id).await.unwrap();
    assert_eq!(del_torneo.len(), 2);
}

#[tokio::test]
async fn test_foreign_claims_are_rejected() {
    let (engine, cancha) = setup().await;
    let apertura = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let clausura = engine
        .torneos
        .create(NewTorneo::new("Clausura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9, 10]).await;
    engine
        .turnos
        .block(ts[1].id, BlockReason::admin("Mantenimiento").unwrap(), None)
        .await
        .unwrap();

    engine
        .torneos
        .assign_turnos(apertura.id, &[ts[0].id], None)
        .await
        .unwrap();
    let report = engine
        .torneos
        .assign_turnos(clausura.id, &[ts[0].id, ts[1].id], None)
        .await
        .unwrap();
    assert!(
        report
            .items
            .iter()
            .all(|item| matches!(item.outcome, AssignOutcome::Rechazado { .. }))
    );

    // Releasing on behalf of another torneo is refused
    let release = engine
        .torneos
        .release_turnos(clausura.id, &[ts[0].id, ts[1].id])
        .await
        .unwrap();
    assert!(matches!(
        release.outcome_of(&ts[0].id),
        Some(ReleaseOutcome::Rechazado { .. })
    ));
    assert!(matches!(
        release.outcome_of(&ts[1].id),
        Some(ReleaseOutcome::Rechazado { .. })
    ));
    assert_eq!(
        engine.turnos.get(ts[0].id).await.unwrap().id_torneo_bloqueo,
        Some(apertura.id)
    );
}

#[tokio::test]
async fn test_release_twice_is_idempotent() {
    let (engine, cancha) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9]).await;
    engine
        .torneos
        .assign_turnos(torneo.id, &[ts[0].id], None)
        .await
        .unwrap();

    let first = engine
        .torneos
        .release_turnos(torneo.id, &[ts[0].id])
        .await
        .unwrap();
    assert_eq!(first.outcome_of(&ts[0].id), Some(&ReleaseOutcome::Liberado));
    let second = engine
        .torneos
        .release_turnos(torneo.id, &[ts[0].id])
        .await
        .unwrap();
    assert_eq!(
        second.outcome_of(&ts[0].id),
        Some(&ReleaseOutcome::YaDisponible)
    );

    let turno = engine.turnos.get(ts[0].id).await.unwrap();
    assert_eq!(turno.estado, TurnoState::Disponible);
    assert_eq!(turno.motivo_bloqueo, None);
}

#[tokio::test]
async fn test_capacity_enforced() {
    let (engine, _) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Relámpago", "padel").with_cupos(2))
        .await
        .unwrap();
    let ids = equipos(&engine, &["Rojo", "Azul", "Verde", "Negro"]).await;

    let report = engine
        .torneos
        .enroll_teams(torneo.id, &[ids[0], ids[1], ids[2], 999])
        .await
        .unwrap();
    assert_eq!(report.outcome_of(&ids[0]), Some(&EnrollOutcome::Inscrito));
    assert_eq!(report.outcome_of(&ids[1]), Some(&EnrollOutcome::Inscrito));
    assert_eq!(report.outcome_of(&ids[2]), Some(&EnrollOutcome::SinCupo));
    assert_eq!(report.outcome_of(&999), Some(&EnrollOutcome::NoEncontrado));
    assert_eq!(engine.torneos.remaining_slots(torneo.id).await.unwrap(), Some(0));

    assert!(matches!(
        engine.torneos.enroll(torneo.id, ids[3]).await,
        Err(TorneoError::Full { cupos: 2, .. })
    ));
    assert!(matches!(
        engine.torneos.enroll(torneo.id, ids[0]).await,
        Err(TorneoError::AlreadyEnrolled { .. })
    ));

    // Withdraw one, then a new team fits
    let withdrawn = engine
        .torneos
        .withdraw_teams(&[
            InscripcionKey {
                id_equipo: ids[0],
                id_torneo: torneo.id,
            },
            InscripcionKey {
                id_equipo: ids[3],
                id_torneo: torneo.id,
            },
        ])
        .await;
    assert_eq!(withdrawn.items[0].outcome, WithdrawOutcome::Retirado);
    assert_eq!(withdrawn.items[1].outcome, WithdrawOutcome::NoInscrito);

    engine.torneos.enroll(torneo.id, ids[2]).await.unwrap();
    assert_eq!(engine.torneos.enrolled_count(torneo.id).await.unwrap(), 2);

    let inscripciones = engine
        .torneos
        .inscripciones(&InscripcionFilter {
            id_torneo: Some(torneo.id),
            id_equipo: None,
        })
        .await
        .unwrap();
    let mut enrolled: Vec<_> = inscripciones.iter().map(|i| i.id_equipo).collect();
    enrolled.sort();
    assert_eq!(enrolled, vec![ids[1], ids[2]]);
}

#[tokio::test]
async fn test_capacity_cannot_drop_below_enrolled() {
    let (engine, _) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol").with_cupos(4))
        .await
        .unwrap();
    let ids = equipos(&engine, &["Rojo", "Azul", "Verde"]).await;
    engine.torneos.enroll_teams(torneo.id, &ids).await.unwrap();

    let shrink = TorneoUpdate {
        cupos: Some(Some(2)),
        ..Default::default()
    };
    assert!(matches!(
        engine.torneos.update(torneo.id, &shrink).await,
        Err(TorneoError::CapacityBelowEnrolled {
            cupos: 2,
            enrolled: 3
        })
    ));

    let ok = TorneoUpdate {
        cupos: Some(Some(3)),
        estado: Some(TorneoState::EnCurso),
        ..Default::default()
    };
    let updated = engine.torneos.update(torneo.id, &ok).await.unwrap();
    assert_eq!(updated.cupos, Some(3));

    // Play has started, enrollment is closed
    let extra = equipos(&engine, &["Negro"]).await;
    assert!(matches!(
        engine.torneos.enroll(torneo.id, extra[0]).await,
        Err(TorneoError::Closed { .. })
    ));
}

#[tokio::test]
async fn test_delete_cascades_to_turnos_and_enrollments() {
    let (engine, cancha) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let otro = engine
        .torneos
        .create(NewTorneo::new("Clausura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9, 10, 11]).await;
    engine
        .torneos
        .assign_turnos(torneo.id, &[ts[0].id, ts[1].id], None)
        .await
        .unwrap();
    engine
        .torneos
        .assign_turnos(otro.id, &[ts[2].id], None)
        .await
        .unwrap();
    let ids = equipos(&engine, &["Rojo", "Azul"]).await;
    engine.torneos.enroll_teams(torneo.id, &ids).await.unwrap();

    let removal = engine.torneos.delete(torneo.id).await.unwrap();
    let mut released = removal.turnos_liberados.clone();
    released.sort();
    assert_eq!(released, vec![ts[0].id, ts[1].id]);
    assert_eq!(removal.inscripciones_eliminadas, 2);

    for t in &ts[..2] {
        let turno = engine.turnos.get(t.id).await.unwrap();
        assert_eq!(turno.estado, TurnoState::Disponible);
        assert_eq!(turno.motivo_bloqueo, None);
    }
    assert_eq!(
        engine.turnos.get(ts[2].id).await.unwrap().id_torneo_bloqueo,
        Some(otro.id)
    );
    assert!(matches!(
        engine.torneos.get(torneo.id).await,
        Err(TorneoError::NotFound(_))
    ));
    assert!(
        engine
            .torneos
            .inscripciones(&InscripcionFilter {
                id_torneo: Some(torneo.id),
                id_equipo: None,
            })
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_unknown_torneo_is_whole_operation_error() {
    let (engine, cancha) = setup().await;
    let ts = turnos(&engine, cancha, &[9]).await;
    assert!(matches!(
        engine.torneos.assign_turnos(42, &[ts[0].id], None).await,
        Err(TorneoError::NotFound(42))
    ));
    assert!(matches!(
        engine.torneos.enroll_teams(42, &[1]).await,
        Err(TorneoError::NotFound(42))
    ));
}

#[tokio::test]
async fn test_claim_for_deleted_torneo_rejected_by_store() {
    let (engine, cancha) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9]).await;
    engine.torneos.delete(torneo.id).await.unwrap();

    // Straight to the turno transition, past the allocator's lookup
    let claim = Transition::Block {
        reason: BlockReason::Torneo(torneo.id),
        id_usuario_bloqueo: None,
    };
    let err = engine
        .turnos
        .transition(ts[0].id, &claim, at(6))
        .await
        .unwrap_err();
    assert!(matches!(err, TurnoError::TorneoNotFound(id) if id == torneo.id));

    let turno = engine.turnos.get(ts[0].id).await.unwrap();
    assert_eq!(turno.estado, TurnoState::Disponible);
    assert_eq!(turno.id_torneo_bloqueo, None);
}

#[tokio::test]
async fn test_partido_lifecycle_on_claimed_turno() {
    let (engine, cancha) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    let ts = turnos(&engine, cancha, &[9, 10]).await;
    engine
        .torneos
        .assign_turnos(torneo.id, &[ts[0].id], None)
        .await
        .unwrap();
    let ids = equipos(&engine, &["Rojo", "Azul"]).await;
    engine.torneos.enroll_teams(torneo.id, &ids).await.unwrap();

    // 10:00 was never claimed
    assert!(matches!(
        engine
            .torneos
            .create_partido(NewPartido::new(torneo.id).on_turno(ts[1].id).between(ids[0], ids[1]))
            .await,
        Err(TorneoError::TurnoNotClaimed { .. })
    ));

    let mut nuevo = NewPartido::new(torneo.id).on_turno(ts[0].id).between(ids[0], ids[1]);
    nuevo.ronda = Some("final".into());
    let partido = engine.torneos.create_partido(nuevo).await.unwrap();
    assert_eq!(partido.estado, PartidoState::Programado);

    let update = PartidoUpdate {
        marcador_local: Some(Some(2)),
        marcador_visitante: Some(Some(1)),
        id_equipo_ganador: Some(Some(ids[0])),
        estado: Some(PartidoState::Finalizado),
        ..Default::default()
    };
    let jugado = engine.torneos.update_partido(partido.id, &update).await.unwrap();
    assert_eq!(jugado.id_equipo_ganador, Some(ids[0]));
    assert_eq!(jugado.ronda.as_deref(), Some("final"));

    // Moving it to an unclaimed turno is checked like creation
    let mover = PartidoUpdate {
        id_turno: Some(Some(ts[1].id)),
        ..Default::default()
    };
    assert!(matches!(
        engine.torneos.update_partido(partido.id, &mover).await,
        Err(TorneoError::TurnoNotClaimed { .. })
    ));

    let listed = engine.torneos.partidos_del_torneo(torneo.id).await.unwrap();
    assert_eq!(listed, vec![jugado]);

    let removal = engine.torneos.delete(torneo.id).await.unwrap();
    assert_eq!(removal.partidos_eliminados, 1);
    assert!(matches!(
        engine.torneos.get_partido(partido.id).await,
        Err(TorneoError::PartidoNotFound(_))
    ));
    assert!(
        engine
            .torneos
            .partidos(&PartidoFilter::default())
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_partido_validation_runs_before_store() {
    let (engine, _) = setup().await;
    let torneo = engine
        .torneos
        .create(NewTorneo::new("Apertura", "futbol"))
        .await
        .unwrap();
    assert!(matches!(
        engine
            .torneos
            .create_partido(NewPartido::new(torneo.id).between(5, 5))
            .await,
        Err(TorneoError::InvalidField { .. })
    ));
    assert!(matches!(
        engine.torneos.create_partido(NewPartido::new(404)).await,
        Err(TorneoError::NotFound(404))
    ));
}
