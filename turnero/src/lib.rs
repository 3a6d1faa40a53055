//! # Turnero
//!
//! Court booking engine for sports facilities: time slots ("turnos"), their
//! prices, payments, tournaments claiming inventory and team rosters.
//!
//! ## Architecture
//!
//! The engine is split into components, leaf-first:
//!
//! - **Tariff Resolver** ([`pricing`]): base price from the court's tariff plus
//!   the night lighting surcharge
//! - **Turno Store** ([`turno`]): the turno state machine, behind one guarded
//!   transition per store call
//! - **Payment Ledger** ([`pago`]): payment records and the rule that a turno is
//!   only reserved once its payment is completed
//! - **Tournament Allocator** ([`torneo`]): tournament claims on turnos,
//!   capacity-checked team enrollment and the partidos played on claimed turnos
//! - **Team Roster** ([`equipo`]): idempotent team membership
//! - **Booking Façade** ([`booking`]): quote, pay, confirm and reserve in one
//!   transaction
//!
//! Storage sits behind the [`db::Store`] trait, implemented for PostgreSQL
//! ([`db::PgStore`]) and in memory ([`db::MemoryStore`]).
//!
//! ## Example
//!
//! ```
//! use turnero::{Engine, EngineConfig};
//!
//! let engine = Engine::in_memory(EngineConfig::default());
//! assert_eq!(engine.backend(), "memory");
//! ```

/// Per-item reporting for bulk operations.
pub mod bulk;

/// Booking façade.
pub mod booking;

/// Courts, tariffs, add-on services and clients.
pub mod catalog;

/// Facility-local clock.
pub mod clock;

/// Database connection, repositories and storage backends.
pub mod db;

/// Engine wiring.
pub mod engine;

/// Teams and rosters.
pub mod equipo;

/// Error classification shared by all components.
pub mod error;

/// Payment ledger.
pub mod pago;

/// Tariff resolution.
pub mod pricing;

/// Tournaments.
pub mod torneo;

/// Turnos and their state machine.
pub mod turno;

pub use booking::{BookingError, BookingFacade, BookingRequest};
pub use bulk::{BulkReport, ItemReport};
pub use engine::{Engine, EngineConfig};
pub use error::{DomainError, ErrorKind};
pub use pricing::{Quote, TariffResolver};
