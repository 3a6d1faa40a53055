//! Payment ledger.
//!
//! A pago is `iniciado` until it is confirmed (`completado`) or failed
//! (`fallido`); both outcomes are terminal. Confirming a pago linked to a
//! turno reserves that turno in the same atomic write, so a completed
//! payment and its reservation always appear together.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use turnero::db::MemoryStore;
//! use turnero::pago::{Confirmation, LedgerConfig, PagoLedger};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ledger = PagoLedger::new(Arc::new(MemoryStore::new()), LedgerConfig::default());
//!     let pago = ledger.confirm(1, &Confirmation::default()).await?;
//!     println!("Pago {} is {}", pago.id, pago.estado);
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod ledger;
pub mod models;

pub use errors::{PagoError, PagoResult};
pub use ledger::PagoLedger;
pub use models::{
    Confirmation, DEFAULT_EXPIRATION_MINUTES, LedgerConfig, NewPago, Pago, PagoFilter, PagoId,
    PagoState,
};
