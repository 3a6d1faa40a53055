//! Turno module: court time slots and their guarded lifecycle.
//!
//! ```text
//! disponible ──reserve──▶ reservado ──cancel──▶ cancelado
//!     ▲  │                    │
//!     │  block                finish
//!  release│                    ▼
//!     │  ▼                 finalizado
//!   bloqueado
//! ```
//!
//! Every state change goes through [`TurnoManager`], which delegates to the
//! store's single guarded transition. Occupying turnos (`reservado`,
//! `bloqueado`) on the same court never overlap.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnero::db::MemoryStore;
//! use turnero::turno::{BlockReason, TurnoManager};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let turnos = TurnoManager::new(Arc::new(MemoryStore::new()));
//!     let turno = turnos.block(1, BlockReason::admin("Mantenimiento")?, Some(7)).await?;
//!     println!("Turno {} is now {}", turno.id, turno.estado);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TurnoError, TurnoResult};
pub use manager::TurnoManager;
pub use models::{
    BlockReason, Change, NewTurno, TORNEO_TAG_PREFIX, Transition, Turno, TurnoDetail,
    TurnoFilter, TurnoId, TurnoServicio, TurnoState, TurnoTotal, TurnoUpdate, parse_torneo_tag,
    torneo_tag, validate_interval,
};
