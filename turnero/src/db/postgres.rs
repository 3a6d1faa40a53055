//! PostgreSQL store.
//!
//! Every operation runs under [`within`] with the configured deadline.
//! Turno writes take locks in a fixed order: the owning torneo row when the
//! write claims or releases for a tournament, then the court's
//! transaction-scoped advisory lock, then the turno row (`FOR UPDATE`), then
//! any pago row. The schema's exclusion constraint backs the overlap check.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgConnection, PgPool, PgRow};
use sqlx::Row;

use super::config::DatabaseConfig;
use super::repository::{
    CatalogRepository, EquipoRepository, PagoRepository, ReservaRepository, Store,
    TorneoRepository, TurnoRepository,
};
use super::timeouts::within;
use super::Database;
use crate::booking::{BookedRecords, BookingError, BookingOrder, BookingResult, BookingStep};
use crate::catalog::{
    Cancha, CanchaId, CatalogError, CatalogResult, Cliente, ClienteId, NewCancha, NewCliente,
    NewServicio, NewTarifa, ServicioAdicional, ServicioId, Tarifa,
};
use crate::clock;
use crate::equipo::{
    Equipo, EquipoError, EquipoId, EquipoMiembro, EquipoResult, MemberAddOutcome,
    MemberRemoveOutcome, NewEquipo,
};
use crate::pago::{
    Confirmation, NewPago, Pago, PagoError, PagoFilter, PagoId, PagoResult, PagoState,
};
use crate::torneo::{
    EnrollOutcome, Inscripcion, InscripcionFilter, NewPartido, NewTorneo, Partido, PartidoFilter,
    PartidoId, PartidoState, PartidoUpdate, Torneo, TorneoError, TorneoId, TorneoRemoval,
    TorneoResult, TorneoState, TorneoUpdate, WithdrawOutcome,
};
use crate::turno::{
    BlockReason, Change, NewTurno, Transition, Turno, TurnoError, TurnoFilter, TurnoId,
    TurnoResult, TurnoServicio, TurnoState,
};

const TURNO_COLUMNS: &str = "id, id_cancha, fecha_hora_inicio, fecha_hora_fin, estado, \
     precio_final, id_cliente, id_usuario_registro, reserva_created_at, id_usuario_bloqueo, \
     motivo_bloqueo, id_torneo_bloqueo";

const PAGO_COLUMNS: &str = "id, id_turno, monto_turno, monto_servicios, monto_total, id_cliente, \
     id_usuario_registro, estado, metodo_pago, id_gateway_externo, fecha_creacion, \
     fecha_expiracion, fecha_completado";

const TORNEO_COLUMNS: &str = "id, nombre, tipo_deporte, created_at, fecha_inicio, fecha_fin, \
     costo_inscripcion, cupos, reglas, estado";

const PARTIDO_COLUMNS: &str = "id, id_torneo, id_turno, id_equipo_local, id_equipo_visitante, \
     id_equipo_ganador, ronda, marcador_local, marcador_visitante, estado";

/// Store backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: Arc<PgPool>,
    timeout: Duration,
}

impl PgStore {
    /// Create a store over an existing pool
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `timeout` - Deadline applied to every store operation
    pub fn new(pool: Arc<PgPool>, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn from_database(db: &Database, config: &DatabaseConfig) -> Self {
        Self::new(Arc::new(db.pool().clone()), config.operation_timeout())
    }
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: T::Err| sqlx::Error::Decode(e.to_string().into()))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn cancha_from_row(row: &PgRow) -> Result<Cancha, sqlx::Error> {
    Ok(Cancha {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        tipo_deporte: row.try_get("tipo_deporte")?,
        descripcion: row.try_get("descripcion")?,
        activa: row.try_get("activa")?,
    })
}

fn tarifa_from_row(row: &PgRow) -> Result<Tarifa, sqlx::Error> {
    Ok(Tarifa {
        id: row.try_get("id")?,
        id_cancha: row.try_get("id_cancha")?,
        descripcion: row.try_get("descripcion")?,
        precio_hora: row.try_get("precio_hora")?,
        created_at: row.try_get("created_at")?,
    })
}

fn servicio_from_row(row: &PgRow) -> Result<ServicioAdicional, sqlx::Error> {
    Ok(ServicioAdicional {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        precio_actual: row.try_get("precio_actual")?,
        activo: row.try_get("activo")?,
    })
}

fn cliente_from_row(row: &PgRow) -> Result<Cliente, sqlx::Error> {
    Ok(Cliente {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        apellido: row.try_get("apellido")?,
        telefono: row.try_get("telefono")?,
        email: row.try_get("email")?,
    })
}

fn turno_from_row(row: &PgRow) -> Result<Turno, sqlx::Error> {
    Ok(Turno {
        id: row.try_get("id")?,
        id_cancha: row.try_get("id_cancha")?,
        fecha_hora_inicio: row.try_get("fecha_hora_inicio")?,
        fecha_hora_fin: row.try_get("fecha_hora_fin")?,
        estado: parse_column::<TurnoState>(row, "estado")?,
        precio_final: row.try_get("precio_final")?,
        id_cliente: row.try_get("id_cliente")?,
        id_usuario_registro: row.try_get("id_usuario_registro")?,
        reserva_created_at: row.try_get("reserva_created_at")?,
        id_usuario_bloqueo: row.try_get("id_usuario_bloqueo")?,
        motivo_bloqueo: row.try_get("motivo_bloqueo")?,
        id_torneo_bloqueo: row.try_get("id_torneo_bloqueo")?,
    })
}

fn turno_servicio_from_row(row: &PgRow) -> Result<TurnoServicio, sqlx::Error> {
    Ok(TurnoServicio {
        id_turno: row.try_get("id_turno")?,
        id_servicio: row.try_get("id_servicio")?,
        cantidad: row.try_get("cantidad")?,
        precio_unitario_congelado: row.try_get("precio_unitario_congelado")?,
    })
}

fn pago_from_row(row: &PgRow) -> Result<Pago, sqlx::Error> {
    Ok(Pago {
        id: row.try_get("id")?,
        id_turno: row.try_get("id_turno")?,
        monto_turno: row.try_get("monto_turno")?,
        monto_servicios: row.try_get("monto_servicios")?,
        monto_total: row.try_get("monto_total")?,
        id_cliente: row.try_get("id_cliente")?,
        id_usuario_registro: row.try_get("id_usuario_registro")?,
        estado: parse_column::<PagoState>(row, "estado")?,
        metodo_pago: row.try_get("metodo_pago")?,
        id_gateway_externo: row.try_get("id_gateway_externo")?,
        fecha_creacion: row.try_get("fecha_creacion")?,
        fecha_expiracion: row.try_get("fecha_expiracion")?,
        fecha_completado: row.try_get("fecha_completado")?,
    })
}

fn torneo_from_row(row: &PgRow) -> Result<Torneo, sqlx::Error> {
    Ok(Torneo {
        id: row.try_get("id")?,
        nombre: row.try_get("nombre")?,
        tipo_deporte: row.try_get("tipo_deporte")?,
        created_at: row.try_get("created_at")?,
        fecha_inicio: row.try_get("fecha_inicio")?,
        fecha_fin: row.try_get("fecha_fin")?,
        costo_inscripcion: row.try_get("costo_inscripcion")?,
        cupos: row.try_get("cupos")?,
        reglas: row.try_get("reglas")?,
        estado: parse_column::<TorneoState>(row, "estado")?,
    })
}

fn inscripcion_from_row(row: &PgRow) -> Result<Inscripcion, sqlx::Error> {
    Ok(Inscripcion {
        id_equipo: row.try_get("id_equipo")?,
        id_torneo: row.try_get("id_torneo")?,
        fecha_inscripcion: row.try_get("fecha_inscripcion")?,
    })
}

fn partido_from_row(row: &PgRow) -> Result<Partido, sqlx::Error> {
    Ok(Partido {
        id: row.try_get("id")?,
        id_torneo: row.try_get("id_torneo")?,
        id_turno: row.try_get("id_turno")?,
        id_equipo_local: row.try_get("id_equipo_local")?,
        id_equipo_visitante: row.try_get("id_equipo_visitante")?,
        id_equipo_ganador: row.try_get("id_equipo_ganador")?,
        ronda: row.try_get("ronda")?,
        marcador_local: row.try_get("marcador_local")?,
        marcador_visitante: row.try_get("marcador_visitante")?,
        estado: parse_column::<PartidoState>(row, "estado")?,
    })
}

fn equipo_from_row(row: &PgRow) -> Result<Equipo, sqlx::Error> {
    Ok(Equipo {
        id: row.try_get("id")?,
        nombre_equipo: row.try_get("nombre_equipo")?,
        id_capitan: row.try_get("id_capitan")?,
    })
}

async fn cliente_exists(conn: &mut PgConnection, id: ClienteId) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clientes WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await
}

async fn completed_pago_exists(
    conn: &mut PgConnection,
    id_turno: TurnoId,
    id_cliente: Option<ClienteId>,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM pagos
            WHERE id_turno = $1
              AND estado = 'completado'
              AND ($2::bigint IS NULL OR id_cliente = $2)
        )
        "#,
    )
    .bind(id_turno)
    .bind(id_cliente)
    .fetch_one(&mut *conn)
    .await
}

/// Hold the claiming torneo row for the rest of the transaction.
///
/// Taken before any court lock so claims and torneo deletion lock in the
/// same order.
async fn lock_claim_owner(conn: &mut PgConnection, transition: &Transition) -> TurnoResult<()> {
    let Transition::Block {
        reason: BlockReason::Torneo(id_torneo),
        ..
    } = transition
    else {
        return Ok(());
    };
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM torneos WHERE id = $1 FOR SHARE")
        .bind(id_torneo)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or(TurnoError::TorneoNotFound(*id_torneo))
}

/// Serialise on the turno's court, then lock the turno row
async fn lock_turno(conn: &mut PgConnection, id: TurnoId) -> TurnoResult<Turno> {
    let id_cancha: Option<CanchaId> =
        sqlx::query_scalar("SELECT id_cancha FROM turnos WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
    let id_cancha = id_cancha.ok_or(TurnoError::NotFound(id))?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(id_cancha)
        .execute(&mut *conn)
        .await?;

    let sql = format!("SELECT {TURNO_COLUMNS} FROM turnos WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TurnoError::NotFound(id))?;
    Ok(turno_from_row(&row)?)
}

async fn write_turno(conn: &mut PgConnection, turno: &Turno) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE turnos
        SET estado = $2,
            precio_final = $3,
            id_cliente = $4,
            id_usuario_registro = $5,
            reserva_created_at = $6,
            id_usuario_bloqueo = $7,
            motivo_bloqueo = $8,
            id_torneo_bloqueo = $9
        WHERE id = $1
        "#,
    )
    .bind(turno.id)
    .bind(turno.estado.as_str())
    .bind(turno.precio_final)
    .bind(turno.id_cliente)
    .bind(turno.id_usuario_registro)
    .bind(turno.reserva_created_at)
    .bind(turno.id_usuario_bloqueo)
    .bind(&turno.motivo_bloqueo)
    .bind(turno.id_torneo_bloqueo)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Apply a transition to a locked turno and persist it.
///
/// Must run inside the transaction that called [`lock_turno`].
async fn apply_transition(
    conn: &mut PgConnection,
    turno: &Turno,
    transition: &Transition,
    now: NaiveDateTime,
) -> TurnoResult<Change> {
    let change = turno.apply(transition, now)?;
    let Change::Applied(next) = &change else {
        return Ok(change);
    };

    if let Transition::Reserve { id_cliente, .. } = transition {
        if !cliente_exists(conn, *id_cliente).await? {
            return Err(TurnoError::ClienteNotFound(*id_cliente));
        }
        if !completed_pago_exists(conn, turno.id, Some(*id_cliente)).await? {
            return Err(TurnoError::PaymentRequired(turno.id));
        }
    }

    if next.estado.is_occupying() && !turno.estado.is_occupying() {
        let other: Option<TurnoId> = sqlx::query_scalar(
            r#"
            SELECT id FROM turnos
            WHERE id_cancha = $1
              AND id <> $2
              AND estado IN ('reservado', 'bloqueado')
              AND fecha_hora_inicio < $4
              AND fecha_hora_fin > $3
            LIMIT 1
            "#,
        )
        .bind(next.id_cancha)
        .bind(next.id)
        .bind(next.fecha_hora_inicio)
        .bind(next.fecha_hora_fin)
        .fetch_optional(&mut *conn)
        .await?;
        if let Some(other) = other {
            return Err(TurnoError::Overlap { id: next.id, other });
        }
    }

    write_turno(conn, next).await?;
    Ok(change)
}

async fn write_pago(conn: &mut PgConnection, pago: &Pago) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pagos
        SET estado = $2,
            metodo_pago = $3,
            id_gateway_externo = $4,
            fecha_completado = $5
        WHERE id = $1
        "#,
    )
    .bind(pago.id)
    .bind(pago.estado.as_str())
    .bind(&pago.metodo_pago)
    .bind(&pago.id_gateway_externo)
    .bind(pago.fecha_completado)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_pago(
    conn: &mut PgConnection,
    nuevo: &NewPago,
    monto_total: i64,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<Pago, sqlx::Error> {
    let sql = format!(
        r#"
        INSERT INTO pagos (id_turno, monto_turno, monto_servicios, monto_total, id_cliente,
                           id_usuario_registro, estado, metodo_pago, fecha_creacion,
                           fecha_expiracion)
        VALUES ($1, $2, $3, $4, $5, $6, 'iniciado', $7, $8, $9)
        RETURNING {PAGO_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(nuevo.id_turno)
        .bind(nuevo.monto_turno)
        .bind(nuevo.monto_servicios)
        .bind(monto_total)
        .bind(nuevo.id_cliente)
        .bind(nuevo.id_usuario_registro)
        .bind(&nuevo.metodo_pago)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *conn)
        .await?;
    pago_from_row(&row)
}

async fn enrolled_count(conn: &mut PgConnection, id_torneo: TorneoId) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM equipo_torneo WHERE id_torneo = $1")
        .bind(id_torneo)
        .fetch_one(&mut *conn)
        .await
}

async fn lock_torneo(conn: &mut PgConnection, id: TorneoId) -> TorneoResult<Torneo> {
    let sql = format!("SELECT {TORNEO_COLUMNS} FROM torneos WHERE id = $1 FOR UPDATE");
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TorneoError::NotFound(id))?;
    Ok(torneo_from_row(&row)?)
}

async fn share_torneo(conn: &mut PgConnection, id: TorneoId) -> TorneoResult<()> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM torneos WHERE id = $1 FOR SHARE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    found.map(|_| ()).ok_or(TorneoError::NotFound(id))
}

/// Guards for writing `partido`, in lock order: torneo row (`FOR SHARE`),
/// then the turno row. Only fields changed from `previous` are rechecked.
async fn check_partido(
    conn: &mut PgConnection,
    partido: &Partido,
    previous: Option<&Partido>,
) -> TorneoResult<()> {
    partido.validate()?;
    let id_torneo = partido.id_torneo;
    share_torneo(conn, id_torneo).await?;

    if let Some(id_turno) = partido.id_turno {
        // Exclusive row lock serialises partidos competing for one turno
        let row = sqlx::query(
            "SELECT estado, id_torneo_bloqueo FROM turnos WHERE id = $1 FOR UPDATE",
        )
        .bind(id_turno)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(TurnoError::NotFound(id_turno))?;
        if previous.is_none_or(|p| p.id_turno != Some(id_turno)) {
            let estado = parse_column::<TurnoState>(&row, "estado")?;
            let owner: Option<TorneoId> = row.try_get("id_torneo_bloqueo")?;
            if estado != TurnoState::Bloqueado || owner != Some(id_torneo) {
                return Err(TorneoError::TurnoNotClaimed {
                    id_turno,
                    id_torneo,
                });
            }
        }
        let other: Option<PartidoId> =
            sqlx::query_scalar("SELECT id FROM partidos WHERE id_turno = $1 AND id <> $2")
                .bind(id_turno)
                .bind(partido.id)
                .fetch_optional(&mut *conn)
                .await?;
        if let Some(id_partido) = other {
            return Err(TorneoError::TurnoInUse {
                id_turno,
                id_partido,
            });
        }
    }

    let known: Vec<EquipoId> = previous.map(|p| p.equipos().collect()).unwrap_or_default();
    for id_equipo in partido.equipos().filter(|e| !known.contains(e)) {
        let row = sqlx::query(
            r#"
            SELECT
                EXISTS(SELECT 1 FROM equipos WHERE id = $1) AS equipo,
                EXISTS(SELECT 1 FROM equipo_torneo WHERE id_equipo = $1 AND id_torneo = $2) AS inscrito
            "#,
        )
        .bind(id_equipo)
        .bind(id_torneo)
        .fetch_one(&mut *conn)
        .await?;
        if !row.try_get::<bool, _>("equipo")? {
            return Err(TorneoError::EquipoNotFound(id_equipo));
        }
        if !row.try_get::<bool, _>("inscrito")? {
            return Err(TorneoError::NotEnrolled {
                id_equipo,
                id_torneo,
            });
        }
    }
    Ok(())
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn create_cancha(&self, nueva: &NewCancha) -> CatalogResult<Cancha> {
        within(self.timeout, async {
            let row = sqlx::query(
                r#"
                INSERT INTO canchas (nombre, tipo_deporte, descripcion, activa)
                VALUES ($1, $2, $3, $4)
                RETURNING id, nombre, tipo_deporte, descripcion, activa
                "#,
            )
            .bind(&nueva.nombre)
            .bind(&nueva.tipo_deporte)
            .bind(&nueva.descripcion)
            .bind(nueva.activa)
            .fetch_one(self.pool.as_ref())
            .await?;
            Ok(cancha_from_row(&row)?)
        })
        .await
    }

    async fn get_cancha(&self, id: CanchaId) -> CatalogResult<Option<Cancha>> {
        within(self.timeout, async {
            let row = sqlx::query(
                "SELECT id, nombre, tipo_deporte, descripcion, activa FROM canchas WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
            Ok(row.as_ref().map(cancha_from_row).transpose()?)
        })
        .await
    }

    async fn list_canchas(&self) -> CatalogResult<Vec<Cancha>> {
        within(self.timeout, async {
            let rows = sqlx::query(
                "SELECT id, nombre, tipo_deporte, descripcion, activa FROM canchas ORDER BY id",
            )
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows.iter().map(cancha_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn create_tarifa(&self, nueva: &NewTarifa) -> CatalogResult<Tarifa> {
        within(self.timeout, async {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM canchas WHERE id = $1)")
                    .bind(nueva.id_cancha)
                    .fetch_one(self.pool.as_ref())
                    .await?;
            if !exists {
                return Err(CatalogError::CanchaNotFound(nueva.id_cancha));
            }
            let row = sqlx::query(
                r#"
                INSERT INTO tarifas (id_cancha, descripcion, precio_hora)
                VALUES ($1, $2, $3)
                RETURNING id, id_cancha, descripcion, precio_hora, created_at
                "#,
            )
            .bind(nueva.id_cancha)
            .bind(&nueva.descripcion)
            .bind(nueva.precio_hora)
            .fetch_one(self.pool.as_ref())
            .await?;
            Ok(tarifa_from_row(&row)?)
        })
        .await
    }

    async fn tarifa_for_cancha(&self, id_cancha: CanchaId) -> CatalogResult<Option<Tarifa>> {
        within(self.timeout, async {
            let row = sqlx::query(
                r#"
                SELECT id, id_cancha, descripcion, precio_hora, created_at
                FROM tarifas
                WHERE id_cancha = $1
                ORDER BY created_at DESC, id DESC
                LIMIT 1
                "#,
            )
            .bind(id_cancha)
            .fetch_optional(self.pool.as_ref())
            .await?;
            Ok(row.as_ref().map(tarifa_from_row).transpose()?)
        })
        .await
    }

    async fn list_tarifas(&self) -> CatalogResult<Vec<Tarifa>> {
        within(self.timeout, async {
            let rows = sqlx::query(
                "SELECT id, id_cancha, descripcion, precio_hora, created_at FROM tarifas ORDER BY id",
            )
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows.iter().map(tarifa_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn create_servicio(&self, nuevo: &NewServicio) -> CatalogResult<ServicioAdicional> {
        within(self.timeout, async {
            let row = sqlx::query(
                r#"
                INSERT INTO servicios_adicionales (nombre, precio_actual, activo)
                VALUES ($1, $2, $3)
                RETURNING id, nombre, precio_actual, activo
                "#,
            )
            .bind(&nuevo.nombre)
            .bind(nuevo.precio_actual)
            .bind(nuevo.activo)
            .fetch_one(self.pool.as_ref())
            .await?;
            Ok(servicio_from_row(&row)?)
        })
        .await
    }

    async fn get_servicio(&self, id: ServicioId) -> CatalogResult<Option<ServicioAdicional>> {
        within(self.timeout, async {
            let row = sqlx::query(
                "SELECT id, nombre, precio_actual, activo FROM servicios_adicionales WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
            Ok(row.as_ref().map(servicio_from_row).transpose()?)
        })
        .await
    }

    async fn list_servicios(&self) -> CatalogResult<Vec<ServicioAdicional>> {
        within(self.timeout, async {
            let rows = sqlx::query(
                "SELECT id, nombre, precio_actual, activo FROM servicios_adicionales ORDER BY id",
            )
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows.iter().map(servicio_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn set_servicio_activo(
        &self,
        id: ServicioId,
        activo: bool,
    ) -> CatalogResult<ServicioAdicional> {
        within(self.timeout, async {
            let row = sqlx::query(
                r#"
                UPDATE servicios_adicionales SET activo = $2
                WHERE id = $1
                RETURNING id, nombre, precio_actual, activo
                "#,
            )
            .bind(id)
            .bind(activo)
            .fetch_optional(self.pool.as_ref())
            .await?
            .ok_or(CatalogError::ServicioNotFound(id))?;
            Ok(servicio_from_row(&row)?)
        })
        .await
    }

    async fn create_cliente(&self, nuevo: &NewCliente) -> CatalogResult<Cliente> {
        within(self.timeout, async {
            let row = sqlx::query(
                r#"
                INSERT INTO clientes (nombre, apellido, telefono, email)
                VALUES ($1, $2, $3, $4)
                RETURNING id, nombre, apellido, telefono, email
                "#,
            )
            .bind(&nuevo.nombre)
            .bind(&nuevo.apellido)
            .bind(&nuevo.telefono)
            .bind(&nuevo.email)
            .fetch_one(self.pool.as_ref())
            .await?;
            Ok(cliente_from_row(&row)?)
        })
        .await
    }

    async fn get_cliente(&self, id: ClienteId) -> CatalogResult<Option<Cliente>> {
        within(self.timeout, async {
            let row = sqlx::query(
                "SELECT id, nombre, apellido, telefono, email FROM clientes WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?;
            Ok(row.as_ref().map(cliente_from_row).transpose()?)
        })
        .await
    }

    async fn list_clientes(&self) -> CatalogResult<Vec<Cliente>> {
        within(self.timeout, async {
            let rows = sqlx::query(
                "SELECT id, nombre, apellido, telefono, email FROM clientes ORDER BY id",
            )
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows.iter().map(cliente_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }
}

#[async_trait]
impl TurnoRepository for PgStore {
    async fn create_turno(&self, nuevo: &NewTurno, precio_final: i64) -> TurnoResult<Turno> {
        within(self.timeout, async {
            let activa: Option<bool> =
                sqlx::query_scalar("SELECT activa FROM canchas WHERE id = $1")
                    .bind(nuevo.id_cancha)
                    .fetch_optional(self.pool.as_ref())
                    .await?;
            match activa {
                None => return Err(TurnoError::CanchaNotFound(nuevo.id_cancha)),
                Some(false) => return Err(TurnoError::CanchaInactive(nuevo.id_cancha)),
                Some(true) => {}
            }

            let sql = format!(
                r#"
                INSERT INTO turnos (id_cancha, fecha_hora_inicio, fecha_hora_fin, estado,
                                    precio_final, id_usuario_registro)
                VALUES ($1, $2, $3, 'disponible', $4, $5)
                RETURNING {TURNO_COLUMNS}
                "#
            );
            let row = sqlx::query(&sql)
                .bind(nuevo.id_cancha)
                .bind(nuevo.fecha_hora_inicio)
                .bind(nuevo.fecha_hora_fin)
                .bind(precio_final)
                .bind(nuevo.id_usuario_registro)
                .fetch_one(self.pool.as_ref())
                .await?;
            Ok(turno_from_row(&row)?)
        })
        .await
    }

    async fn get_turno(&self, id: TurnoId) -> TurnoResult<Option<Turno>> {
        within(self.timeout, async {
            let sql = format!("SELECT {TURNO_COLUMNS} FROM turnos WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok(row.as_ref().map(turno_from_row).transpose()?)
        })
        .await
    }

    async fn list_turnos(&self, filter: &TurnoFilter) -> TurnoResult<Vec<Turno>> {
        within(self.timeout, async {
            let sql = format!(
                r#"
                SELECT {TURNO_COLUMNS} FROM turnos
                WHERE ($1::bigint IS NULL OR id_cancha = $1)
                  AND ($2::text IS NULL OR estado = $2)
                  AND ($3::bigint IS NULL OR id_cliente = $3)
                  AND ($4::bigint IS NULL OR id_torneo_bloqueo = $4)
                ORDER BY fecha_hora_inicio, id
                "#
            );
            let rows = sqlx::query(&sql)
                .bind(filter.id_cancha)
                .bind(filter.estado.map(|e| e.as_str()))
                .bind(filter.id_cliente)
                .bind(filter.id_torneo)
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.iter().map(turno_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn transition_turno(
        &self,
        id: TurnoId,
        transition: &Transition,
        now: NaiveDateTime,
    ) -> TurnoResult<Change> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            lock_claim_owner(&mut tx, transition).await?;
            let turno = lock_turno(&mut tx, id).await?;
            let change = apply_transition(&mut tx, &turno, transition, now).await?;
            tx.commit().await?;
            Ok(change)
        })
        .await
    }

    async fn delete_turno(&self, id: TurnoId) -> TurnoResult<()> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let turno = lock_turno(&mut tx, id).await?;
            if turno.estado.is_occupying() {
                return Err(TurnoError::Occupied(id));
            }
            if completed_pago_exists(&mut tx, id, None).await? {
                return Err(TurnoError::HasCompletedPayment(id));
            }
            sqlx::query("DELETE FROM turnos WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn turno_servicios(&self, id: TurnoId) -> TurnoResult<Vec<TurnoServicio>> {
        within(self.timeout, async {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM turnos WHERE id = $1)")
                    .bind(id)
                    .fetch_one(self.pool.as_ref())
                    .await?;
            if !exists {
                return Err(TurnoError::NotFound(id));
            }
            let rows = sqlx::query(
                r#"
                SELECT id_turno, id_servicio, cantidad, precio_unitario_congelado
                FROM turno_servicios
                WHERE id_turno = $1
                ORDER BY id_servicio
                "#,
            )
            .bind(id)
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows
                .iter()
                .map(turno_servicio_from_row)
                .collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn finish_elapsed(&self, now: NaiveDateTime) -> TurnoResult<Vec<TurnoId>> {
        within(self.timeout, async {
            // Finishing frees nothing, so no overlap check or advisory lock is needed
            let ids: Vec<TurnoId> = sqlx::query_scalar(
                r#"
                UPDATE turnos SET estado = 'finalizado'
                WHERE estado = 'reservado' AND fecha_hora_fin <= $1
                RETURNING id
                "#,
            )
            .bind(now)
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(ids)
        })
        .await
    }
}

#[async_trait]
impl PagoRepository for PgStore {
    async fn create_pago(
        &self,
        nuevo: &NewPago,
        expires_at: Option<DateTime<Utc>>,
    ) -> PagoResult<Pago> {
        let monto_total = nuevo.total()?;
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            if !cliente_exists(&mut tx, nuevo.id_cliente).await? {
                return Err(PagoError::ClienteNotFound(nuevo.id_cliente));
            }
            if let Some(id_turno) = nuevo.id_turno {
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM turnos WHERE id = $1)")
                        .bind(id_turno)
                        .fetch_one(&mut *tx)
                        .await?;
                if !exists {
                    return Err(PagoError::TurnoNotFound(id_turno));
                }
                if completed_pago_exists(&mut tx, id_turno, None).await? {
                    return Err(PagoError::TurnoAlreadyPaid(id_turno));
                }
            }
            let pago = insert_pago(&mut tx, nuevo, monto_total, Utc::now(), expires_at).await?;
            tx.commit().await?;
            Ok(pago)
        })
        .await
    }

    async fn get_pago(&self, id: PagoId) -> PagoResult<Option<Pago>> {
        within(self.timeout, async {
            let sql = format!("SELECT {PAGO_COLUMNS} FROM pagos WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok(row.as_ref().map(pago_from_row).transpose()?)
        })
        .await
    }

    async fn list_pagos(&self, filter: &PagoFilter) -> PagoResult<Vec<Pago>> {
        within(self.timeout, async {
            let sql = format!(
                r#"
                SELECT {PAGO_COLUMNS} FROM pagos
                WHERE ($1::bigint IS NULL OR id_cliente = $1)
                  AND ($2::bigint IS NULL OR id_turno = $2)
                  AND ($3::text IS NULL OR estado = $3)
                ORDER BY id
                "#
            );
            let rows = sqlx::query(&sql)
                .bind(filter.id_cliente)
                .bind(filter.id_turno)
                .bind(filter.estado.map(|e| e.as_str()))
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.iter().map(pago_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn confirm_pago(
        &self,
        id: PagoId,
        confirmation: &Confirmation,
        at: DateTime<Utc>,
    ) -> PagoResult<Pago> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;

            let id_turno: Option<Option<TurnoId>> =
                sqlx::query_scalar("SELECT id_turno FROM pagos WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let id_turno = id_turno.ok_or(PagoError::NotFound(id))?;

            // Court and turno locks come before the pago row lock
            let turno = match id_turno {
                Some(id_turno) => Some(lock_turno(&mut tx, id_turno).await?),
                None => None,
            };

            let sql = format!("SELECT {PAGO_COLUMNS} FROM pagos WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(PagoError::NotFound(id))?;
            let confirmed = pago_from_row(&row)?.confirmed(confirmation, at)?;

            if let Some(turno) = &turno {
                if completed_pago_exists(&mut tx, turno.id, None).await? {
                    return Err(PagoError::TurnoAlreadyPaid(turno.id));
                }
            }
            write_pago(&mut tx, &confirmed).await.map_err(|e| {
                match (is_unique_violation(&e), confirmed.id_turno) {
                    (true, Some(id_turno)) => PagoError::TurnoAlreadyPaid(id_turno),
                    _ => PagoError::Database(e),
                }
            })?;

            if let Some(turno) = &turno {
                let reserve = Transition::Reserve {
                    id_cliente: confirmed.id_cliente,
                    id_usuario_registro: confirmed.id_usuario_registro,
                    at,
                };
                apply_transition(&mut tx, turno, &reserve, clock::to_local(at)).await?;
            }

            tx.commit().await?;
            Ok(confirmed)
        })
        .await
    }

    async fn fail_pago(&self, id: PagoId) -> PagoResult<Pago> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let sql = format!("SELECT {PAGO_COLUMNS} FROM pagos WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(PagoError::NotFound(id))?;
            let failed = pago_from_row(&row)?.failed()?;
            write_pago(&mut tx, &failed).await?;
            tx.commit().await?;
            Ok(failed)
        })
        .await
    }

    async fn delete_pago(&self, id: PagoId) -> PagoResult<()> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let sql = format!("SELECT {PAGO_COLUMNS} FROM pagos WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(PagoError::NotFound(id))?;
            let pago = pago_from_row(&row)?;

            if let (PagoState::Completado, Some(id_turno)) = (pago.estado, pago.id_turno) {
                let estado: Option<String> =
                    sqlx::query_scalar("SELECT estado FROM turnos WHERE id = $1 FOR UPDATE")
                        .bind(id_turno)
                        .fetch_optional(&mut *tx)
                        .await?;
                if estado.as_deref() == Some(TurnoState::Reservado.as_str()) {
                    return Err(PagoError::BacksReservation { id, id_turno });
                }
            }

            sqlx::query("DELETE FROM pagos WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl TorneoRepository for PgStore {
    async fn create_torneo(&self, nuevo: &NewTorneo) -> TorneoResult<Torneo> {
        within(self.timeout, async {
            let sql = format!(
                r#"
                INSERT INTO torneos (nombre, tipo_deporte, fecha_inicio, fecha_fin,
                                     costo_inscripcion, cupos, reglas, estado)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {TORNEO_COLUMNS}
                "#
            );
            let row = sqlx::query(&sql)
                .bind(&nuevo.nombre)
                .bind(&nuevo.tipo_deporte)
                .bind(nuevo.fecha_inicio)
                .bind(nuevo.fecha_fin)
                .bind(nuevo.costo_inscripcion)
                .bind(nuevo.cupos)
                .bind(&nuevo.reglas)
                .bind(nuevo.estado.as_str())
                .fetch_one(self.pool.as_ref())
                .await?;
            Ok(torneo_from_row(&row)?)
        })
        .await
    }

    async fn get_torneo(&self, id: TorneoId) -> TorneoResult<Option<Torneo>> {
        within(self.timeout, async {
            let sql = format!("SELECT {TORNEO_COLUMNS} FROM torneos WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok(row.as_ref().map(torneo_from_row).transpose()?)
        })
        .await
    }

    async fn list_torneos(&self, estado: Option<TorneoState>) -> TorneoResult<Vec<Torneo>> {
        within(self.timeout, async {
            let sql = format!(
                "SELECT {TORNEO_COLUMNS} FROM torneos \
                 WHERE ($1::text IS NULL OR estado = $1) ORDER BY id"
            );
            let rows = sqlx::query(&sql)
                .bind(estado.map(|e| e.as_str()))
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.iter().map(torneo_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn update_torneo(&self, id: TorneoId, update: &TorneoUpdate) -> TorneoResult<Torneo> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let torneo = lock_torneo(&mut tx, id).await?;
            let enrolled = enrolled_count(&mut tx, id).await?;
            let updated = update.apply_to(&torneo, enrolled)?;

            sqlx::query(
                r#"
                UPDATE torneos
                SET nombre = $2, tipo_deporte = $3, fecha_inicio = $4, fecha_fin = $5,
                    costo_inscripcion = $6, cupos = $7, reglas = $8, estado = $9
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&updated.nombre)
            .bind(&updated.tipo_deporte)
            .bind(updated.fecha_inicio)
            .bind(updated.fecha_fin)
            .bind(updated.costo_inscripcion)
            .bind(updated.cupos)
            .bind(&updated.reglas)
            .bind(updated.estado.as_str())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(updated)
        })
        .await
    }

    async fn delete_torneo(&self, id: TorneoId) -> TorneoResult<TorneoRemoval> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            // Torneo row first, then court locks in ascending court order
            lock_torneo(&mut tx, id).await?;

            let mut claimed: Vec<TurnoId> = sqlx::query_scalar(
                r#"
                SELECT id FROM turnos
                WHERE id_torneo_bloqueo = $1 AND estado = 'bloqueado'
                ORDER BY id_cancha, id
                "#,
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let release = Transition::Release { owner: Some(id) };
            let now = clock::now_local();
            for id_turno in &claimed {
                let turno = lock_turno(&mut tx, *id_turno).await?;
                apply_transition(&mut tx, &turno, &release, now).await?;
            }
            claimed.sort_unstable();

            let partidos = sqlx::query("DELETE FROM partidos WHERE id_torneo = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            let inscripciones = sqlx::query("DELETE FROM equipo_torneo WHERE id_torneo = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            sqlx::query("DELETE FROM torneos WHERE id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(TorneoRemoval {
                id_torneo: id,
                turnos_liberados: claimed,
                inscripciones_eliminadas: inscripciones,
                partidos_eliminados: partidos,
            })
        })
        .await
    }

    async fn enroll_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<EnrollOutcome> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            // Row lock on the torneo serialises concurrent enrollments
            let torneo = lock_torneo(&mut tx, id_torneo).await?;

            let equipo_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipos WHERE id = $1)")
                    .bind(id_equipo)
                    .fetch_one(&mut *tx)
                    .await?;
            if !equipo_exists {
                return Ok(EnrollOutcome::NoEncontrado);
            }

            let enrolled: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM equipo_torneo WHERE id_torneo = $1 AND id_equipo = $2)",
            )
            .bind(id_torneo)
            .bind(id_equipo)
            .fetch_one(&mut *tx)
            .await?;
            if enrolled {
                return Ok(EnrollOutcome::YaInscrito);
            }

            if !torneo.estado.accepts_enrollment() {
                let motivo = TorneoError::Closed {
                    id: id_torneo,
                    estado: torneo.estado,
                }
                .to_string();
                return Ok(EnrollOutcome::Rechazado { motivo });
            }

            let count = enrolled_count(&mut tx, id_torneo).await?;
            if !torneo.has_room(count) {
                return Ok(EnrollOutcome::SinCupo);
            }

            sqlx::query("INSERT INTO equipo_torneo (id_equipo, id_torneo) VALUES ($1, $2)")
                .bind(id_equipo)
                .bind(id_torneo)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            Ok(EnrollOutcome::Inscrito)
        })
        .await
    }

    async fn withdraw_equipo(
        &self,
        id_torneo: TorneoId,
        id_equipo: EquipoId,
    ) -> TorneoResult<WithdrawOutcome> {
        within(self.timeout, async {
            let removed =
                sqlx::query("DELETE FROM equipo_torneo WHERE id_torneo = $1 AND id_equipo = $2")
                    .bind(id_torneo)
                    .bind(id_equipo)
                    .execute(self.pool.as_ref())
                    .await?
                    .rows_affected();
            Ok(if removed > 0 {
                WithdrawOutcome::Retirado
            } else {
                WithdrawOutcome::NoInscrito
            })
        })
        .await
    }

    async fn list_inscripciones(
        &self,
        filter: &InscripcionFilter,
    ) -> TorneoResult<Vec<Inscripcion>> {
        within(self.timeout, async {
            let rows = sqlx::query(
                r#"
                SELECT id_equipo, id_torneo, fecha_inscripcion FROM equipo_torneo
                WHERE ($1::bigint IS NULL OR id_torneo = $1)
                  AND ($2::bigint IS NULL OR id_equipo = $2)
                ORDER BY id_torneo, id_equipo
                "#,
            )
            .bind(filter.id_torneo)
            .bind(filter.id_equipo)
            .fetch_all(self.pool.as_ref())
            .await?;
            Ok(rows
                .iter()
                .map(inscripcion_from_row)
                .collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn count_inscripciones(&self, id_torneo: TorneoId) -> TorneoResult<i64> {
        within(self.timeout, async {
            let mut conn = self.pool.acquire().await?;
            Ok(enrolled_count(&mut conn, id_torneo).await?)
        })
        .await
    }

    async fn create_partido(&self, nuevo: &NewPartido) -> TorneoResult<Partido> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let partido = nuevo.clone().into_partido(0);
            check_partido(&mut tx, &partido, None).await?;

            let sql = format!(
                r#"
                INSERT INTO partidos (id_torneo, id_turno, id_equipo_local, id_equipo_visitante,
                                      id_equipo_ganador, ronda, marcador_local,
                                      marcador_visitante, estado)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                RETURNING {PARTIDO_COLUMNS}
                "#
            );
            let row = sqlx::query(&sql)
                .bind(partido.id_torneo)
                .bind(partido.id_turno)
                .bind(partido.id_equipo_local)
                .bind(partido.id_equipo_visitante)
                .bind(partido.id_equipo_ganador)
                .bind(&partido.ronda)
                .bind(partido.marcador_local)
                .bind(partido.marcador_visitante)
                .bind(partido.estado.as_str())
                .fetch_one(&mut *tx)
                .await?;
            let created = partido_from_row(&row)?;
            tx.commit().await?;
            Ok(created)
        })
        .await
    }

    async fn get_partido(&self, id: PartidoId) -> TorneoResult<Option<Partido>> {
        within(self.timeout, async {
            let sql = format!("SELECT {PARTIDO_COLUMNS} FROM partidos WHERE id = $1");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok(row.as_ref().map(partido_from_row).transpose()?)
        })
        .await
    }

    async fn list_partidos(&self, filter: &PartidoFilter) -> TorneoResult<Vec<Partido>> {
        within(self.timeout, async {
            let sql = format!(
                "SELECT {PARTIDO_COLUMNS} FROM partidos \
                 WHERE ($1::bigint IS NULL OR id_torneo = $1) \
                   AND ($2::bigint IS NULL OR id_turno = $2) \
                 ORDER BY id"
            );
            let rows = sqlx::query(&sql)
                .bind(filter.id_torneo)
                .bind(filter.id_turno)
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.iter().map(partido_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn update_partido(
        &self,
        id: PartidoId,
        update: &PartidoUpdate,
    ) -> TorneoResult<Partido> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            // Torneo row before the partido row, as torneo deletion does
            let id_torneo: Option<TorneoId> =
                sqlx::query_scalar("SELECT id_torneo FROM partidos WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;
            share_torneo(&mut tx, id_torneo.ok_or(TorneoError::PartidoNotFound(id))?).await?;

            let sql = format!("SELECT {PARTIDO_COLUMNS} FROM partidos WHERE id = $1 FOR UPDATE");
            let row = sqlx::query(&sql)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(TorneoError::PartidoNotFound(id))?;
            let current = partido_from_row(&row)?;
            let updated = update.apply_to(&current)?;
            check_partido(&mut tx, &updated, Some(&current)).await?;

            sqlx::query(
                r#"
                UPDATE partidos
                SET id_turno = $2, id_equipo_local = $3, id_equipo_visitante = $4,
                    id_equipo_ganador = $5, ronda = $6, marcador_local = $7,
                    marcador_visitante = $8, estado = $9
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(updated.id_turno)
            .bind(updated.id_equipo_local)
            .bind(updated.id_equipo_visitante)
            .bind(updated.id_equipo_ganador)
            .bind(&updated.ronda)
            .bind(updated.marcador_local)
            .bind(updated.marcador_visitante)
            .bind(updated.estado.as_str())
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(updated)
        })
        .await
    }

    async fn delete_partido(&self, id: PartidoId) -> TorneoResult<()> {
        within(self.timeout, async {
            let removed = sqlx::query("DELETE FROM partidos WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref())
                .await?
                .rows_affected();
            if removed == 0 {
                return Err(TorneoError::PartidoNotFound(id));
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl EquipoRepository for PgStore {
    async fn create_equipo(&self, nuevo: &NewEquipo) -> EquipoResult<Equipo> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            if let Some(capitan) = nuevo.id_capitan {
                if !cliente_exists(&mut tx, capitan).await? {
                    return Err(EquipoError::ClienteNotFound(capitan));
                }
            }
            let row = sqlx::query(
                r#"
                INSERT INTO equipos (nombre_equipo, id_capitan)
                VALUES ($1, $2)
                RETURNING id, nombre_equipo, id_capitan
                "#,
            )
            .bind(&nuevo.nombre_equipo)
            .bind(nuevo.id_capitan)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    EquipoError::DuplicateName(nuevo.nombre_equipo.clone())
                } else {
                    EquipoError::Database(e)
                }
            })?;
            let equipo = equipo_from_row(&row)?;
            tx.commit().await?;
            Ok(equipo)
        })
        .await
    }

    async fn get_equipo(&self, id: EquipoId) -> EquipoResult<Option<Equipo>> {
        within(self.timeout, async {
            let row = sqlx::query("SELECT id, nombre_equipo, id_capitan FROM equipos WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool.as_ref())
                .await?;
            Ok(row.as_ref().map(equipo_from_row).transpose()?)
        })
        .await
    }

    async fn list_equipos(&self) -> EquipoResult<Vec<Equipo>> {
        within(self.timeout, async {
            let rows = sqlx::query("SELECT id, nombre_equipo, id_capitan FROM equipos ORDER BY id")
                .fetch_all(self.pool.as_ref())
                .await?;
            Ok(rows.iter().map(equipo_from_row).collect::<Result<_, _>>()?)
        })
        .await
    }

    async fn add_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberAddOutcome> {
        within(self.timeout, async {
            let mut tx = self.pool.begin().await?;
            let equipo_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipos WHERE id = $1)")
                    .bind(id_equipo)
                    .fetch_one(&mut *tx)
                    .await?;
            if !equipo_exists {
                return Err(EquipoError::NotFound(id_equipo));
            }
            if !cliente_exists(&mut tx, id_cliente).await? {
                return Ok(MemberAddOutcome::ClienteNoEncontrado);
            }
            let inserted = sqlx::query(
                r#"
                INSERT INTO equipo_miembros (id_equipo, id_cliente)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(id_equipo)
            .bind(id_cliente)
            .execute(&mut *tx)
            .await?
            .rows_affected();
            tx.commit().await?;
            Ok(if inserted > 0 {
                MemberAddOutcome::Agregado
            } else {
                MemberAddOutcome::YaMiembro
            })
        })
        .await
    }

    async fn remove_miembro(
        &self,
        id_equipo: EquipoId,
        id_cliente: ClienteId,
    ) -> EquipoResult<MemberRemoveOutcome> {
        within(self.timeout, async {
            let equipo_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipos WHERE id = $1)")
                    .bind(id_equipo)
                    .fetch_one(self.pool.as_ref())
                    .await?;
            if !equipo_exists {
                return Err(EquipoError::NotFound(id_equipo));
            }
            let removed = sqlx::query(
                "DELETE FROM equipo_miembros WHERE id_equipo = $1 AND id_cliente = $2",
            )
            .bind(id_equipo)
            .bind(id_cliente)
            .execute(self.pool.as_ref())
            .await?
            .rows_affected();
            Ok(if removed > 0 {
                MemberRemoveOutcome::Eliminado
            } else {
                MemberRemoveOutcome::NoMiembro
            })
        })
        .await
    }

    async fn list_miembros(&self, id_equipo: EquipoId) -> EquipoResult<Vec<EquipoMiembro>> {
        within(self.timeout, async {
            let equipo_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipos WHERE id = $1)")
                    .bind(id_equipo)
                    .fetch_one(self.pool.as_ref())
                    .await?;
            if !equipo_exists {
                return Err(EquipoError::NotFound(id_equipo));
            }
            let rows = sqlx::query(
                "SELECT id_equipo, id_cliente FROM equipo_miembros WHERE id_equipo = $1 ORDER BY id_cliente",
            )
            .bind(id_equipo)
            .fetch_all(self.pool.as_ref())
            .await?;
            let mut miembros = Vec::with_capacity(rows.len());
            for row in &rows {
                miembros.push(EquipoMiembro {
                    id_equipo: row.try_get("id_equipo")?,
                    id_cliente: row.try_get("id_cliente")?,
                });
            }
            Ok(miembros)
        })
        .await
    }
}

#[async_trait]
impl ReservaRepository for PgStore {
    async fn book(&self, order: &BookingOrder) -> BookingResult<BookedRecords> {
        use BookingStep::{Confirmacion, Pago as PagoStep, Reserva, Servicios, Transaccion};

        within(self.timeout, async {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| BookingError::database(Transaccion, e))?;

            let turno = lock_turno(&mut tx, order.id_turno)
                .await
                .map_err(BookingError::Reservation)?;
            if turno.estado != TurnoState::Disponible {
                return Err(BookingError::Reservation(TurnoError::NotAvailable {
                    id: turno.id,
                    estado: turno.estado,
                }));
            }

            let monto_total = order
                .pago
                .total()
                .map_err(|e| BookingError::payment(PagoStep, e))?;
            let already_paid = completed_pago_exists(&mut tx, turno.id, None)
                .await
                .map_err(|e| BookingError::database(PagoStep, e))?;
            if already_paid {
                return Err(BookingError::payment(
                    PagoStep,
                    PagoError::TurnoAlreadyPaid(turno.id),
                ));
            }
            let pago = insert_pago(&mut tx, &order.pago, monto_total, order.at, order.expires_at)
                .await
                .map_err(|e| BookingError::database(PagoStep, e))?;

            let confirmed = pago
                .confirmed(&order.confirmation, order.at)
                .map_err(|e| BookingError::payment(Confirmacion, e))?;
            write_pago(&mut tx, &confirmed)
                .await
                .map_err(|e| BookingError::database(Confirmacion, e))?;

            let reserve = Transition::Reserve {
                id_cliente: order.id_cliente,
                id_usuario_registro: order.id_usuario_registro,
                at: order.at,
            };
            let mut reserved = apply_transition(&mut tx, &turno, &reserve, clock::to_local(order.at))
                .await
                .map_err(BookingError::Reservation)?
                .into_turno();
            reserved.precio_final = order.quote.precio_final;
            sqlx::query("UPDATE turnos SET precio_final = $2 WHERE id = $1")
                .bind(reserved.id)
                .bind(reserved.precio_final)
                .execute(&mut *tx)
                .await
                .map_err(|e| BookingError::database(Reserva, e))?;

            for servicio in &order.servicios {
                sqlx::query(
                    r#"
                    INSERT INTO turno_servicios (id_turno, id_servicio, cantidad, precio_unitario_congelado)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(servicio.id_turno)
                .bind(servicio.id_servicio)
                .bind(servicio.cantidad)
                .bind(servicio.precio_unitario_congelado)
                .execute(&mut *tx)
                .await
                .map_err(|e| BookingError::database(Servicios, e))?;
            }

            tx.commit()
                .await
                .map_err(|e| BookingError::database(Transaccion, e))?;

            Ok(BookedRecords {
                turno: reserved,
                pago: confirmed,
                servicios: order.servicios.clone(),
            })
        })
        .await
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(self.pool.as_ref())
            .await
            .is_ok()
    }
}
