//! Tariff resolution: base price from the court's tariff plus the night
//! lighting surcharge.
//!
//! The computation itself is the pure [`quote`] function; [`TariffResolver`]
//! only loads the inputs from the store.

pub mod errors;
pub mod models;
pub mod resolver;

pub use errors::{TarifaError, TarifaResult};
pub use models::Quote;
pub use resolver::{
    NIGHT_END_MINUTE, NIGHT_START_MINUTE, TariffResolver, needs_lighting, prorate, quote,
};
