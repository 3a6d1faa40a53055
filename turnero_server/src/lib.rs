//! HTTP server for the turnero court booking engine.
//!
//! The binary in `main.rs` wires these modules together; they are exposed as a
//! library so the router can be driven directly in tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod tasks;
