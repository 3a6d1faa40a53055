//! Catalog module: courts, tariffs, add-on services and clients.
//!
//! These are plain records the rest of the engine reads; the only guarded
//! behavior is input validation and the `activo` toggle on services.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{CatalogError, CatalogResult};
pub use manager::CatalogManager;
pub use models::{
    Cancha, CanchaId, Cliente, ClienteId, NewCancha, NewCliente, NewServicio, NewTarifa,
    ServicioAdicional, ServicioId, Tarifa, TarifaId, UsuarioId,
};
