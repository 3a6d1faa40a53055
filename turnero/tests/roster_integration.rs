//! Integration tests for team rosters.

use turnero::catalog::NewCliente;
use turnero::equipo::{EquipoError, MemberAddOutcome, MemberRemoveOutcome, NewEquipo};
use turnero::{Engine, EngineConfig};

async fn setup() -> (Engine, i64, Vec<i64>) {
    let engine = Engine::in_memory(EngineConfig::default());
    let mut clientes = Vec::new();
    for (nombre, telefono) in [("Ana", "555-0101"), ("Luis", "555-0102"), ("Sofía", "555-0103")] {
        clientes.push(
            engine
                .catalog
                .create_cliente(NewCliente::new(nombre, telefono))
                .await
                .unwrap()
                .id,
        );
    }
    let equipo = engine
        .equipos
        .create(NewEquipo {
            nombre_equipo: "Los Pumas".into(),
            id_capitan: Some(clientes[0]),
        })
        .await
        .unwrap();
    (engine, equipo.id, clientes)
}

#[tokio::test]
async fn test_adding_same_member_twice_keeps_one_record() {
    let (engine, equipo, clientes) = setup().await;

    let first = engine
        .equipos
        .add_members(equipo, &[clientes[0], clientes[1]])
        .await
        .unwrap();
    assert_eq!(first.count(|o| *o == MemberAddOutcome::Agregado), 2);

    let second = engine
        .equipos
        .add_members(equipo, &[clientes[1], clientes[2]])
        .await
        .unwrap();
    assert_eq!(
        second.outcome_of(&clientes[1]),
        Some(&MemberAddOutcome::YaMiembro)
    );
    assert_eq!(
        second.outcome_of(&clientes[2]),
        Some(&MemberAddOutcome::Agregado)
    );

    let miembros = engine.equipos.list_miembros(equipo).await.unwrap();
    assert_eq!(miembros.len(), 3);
    assert_eq!(
        miembros.iter().filter(|m| m.id_cliente == clientes[1]).count(),
        1
    );
}

#[tokio::test]
async fn test_removing_absent_member_is_no_op() {
    let (engine, equipo, clientes) = setup().await;
    engine
        .equipos
        .add_members(equipo, &[clientes[0]])
        .await
        .unwrap();

    let report = engine
        .equipos
        .remove_members(equipo, &[clientes[0], clientes[1]])
        .await
        .unwrap();
    assert_eq!(
        report.outcome_of(&clientes[0]),
        Some(&MemberRemoveOutcome::Eliminado)
    );
    assert_eq!(
        report.outcome_of(&clientes[1]),
        Some(&MemberRemoveOutcome::NoMiembro)
    );

    let again = engine
        .equipos
        .remove_member(equipo, clientes[0])
        .await
        .unwrap();
    assert_eq!(again, MemberRemoveOutcome::NoMiembro);
    assert!(engine.equipos.list_miembros(equipo).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_team_validation() {
    let (engine, _, _) = setup().await;
    assert!(matches!(
        engine
            .equipos
            .create(NewEquipo {
                nombre_equipo: "Los Pumas".into(),
                id_capitan: None,
            })
            .await,
        Err(EquipoError::DuplicateName(_))
    ));
    assert!(matches!(
        engine
            .equipos
            .create(NewEquipo {
                nombre_equipo: "Halcones".into(),
                id_capitan: Some(404),
            })
            .await,
        Err(EquipoError::ClienteNotFound(404))
    ));
    assert_eq!(engine.equipos.list().await.unwrap().len(), 1);
}
