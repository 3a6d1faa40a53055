//! Tournament module: tournaments, court claims and team enrollment.
//!
//! A tournament claims turnos by blocking them with the `Torneo:<id>` tag;
//! only the owning tournament may release its claims. Enrollment respects
//! `cupos` atomically with the insert. Partidos are scheduled on turnos
//! their torneo has claimed.

pub mod allocator;
pub mod errors;
pub mod models;
pub mod partido;

pub use allocator::TorneoAllocator;
pub use errors::{TorneoError, TorneoResult};
pub use models::{
    AssignOutcome, EnrollOutcome, Inscripcion, InscripcionFilter, InscripcionKey, NewTorneo,
    ReleaseOutcome, Torneo, TorneoId, TorneoRemoval, TorneoState, TorneoUpdate, WithdrawOutcome,
};
pub use partido::{NewPartido, Partido, PartidoFilter, PartidoId, PartidoState, PartidoUpdate};
