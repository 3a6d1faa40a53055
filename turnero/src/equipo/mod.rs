//! Teams and their rosters.

pub mod errors;
pub mod models;
pub mod roster;

pub use errors::{EquipoError, EquipoResult};
pub use models::{
    Equipo, EquipoId, EquipoMiembro, MemberAddOutcome, MemberRemoveOutcome, NewEquipo,
};
pub use roster::TeamRoster;
