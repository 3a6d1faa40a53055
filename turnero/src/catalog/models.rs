//! Catalog data models: courts, tariffs, add-on services and clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{CatalogError, CatalogResult};

/// Cancha ID type
pub type CanchaId = i64;
/// Tarifa ID type
pub type TarifaId = i64;
/// ServicioAdicional ID type
pub type ServicioId = i64;
/// Cliente ID type
pub type ClienteId = i64;
/// Operator (staff user) ID type
pub type UsuarioId = i64;

/// Sports court
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancha {
    pub id: CanchaId,
    pub nombre: String,
    pub tipo_deporte: Option<String>,
    pub descripcion: Option<String>,
    pub activa: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCancha {
    pub nombre: String,
    #[serde(default)]
    pub tipo_deporte: Option<String>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default = "default_true")]
    pub activa: bool,
}

impl NewCancha {
    pub fn new(nombre: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            tipo_deporte: None,
            descripcion: None,
            activa: true,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require_text("nombre", &self.nombre)
    }
}

/// Hourly price policy for a court
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tarifa {
    pub id: TarifaId,
    pub id_cancha: CanchaId,
    pub descripcion: Option<String>,
    /// Price per hour in minor currency units
    pub precio_hora: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTarifa {
    pub id_cancha: CanchaId,
    #[serde(default)]
    pub descripcion: Option<String>,
    pub precio_hora: i64,
}

impl NewTarifa {
    pub fn validate(&self) -> CatalogResult<()> {
        if self.precio_hora < 0 {
            return Err(CatalogError::InvalidPrice(self.precio_hora));
        }
        Ok(())
    }
}

/// Add-on service such as lighting or equipment rental
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicioAdicional {
    pub id: ServicioId,
    pub nombre: String,
    /// Current price in minor currency units
    pub precio_actual: i64,
    pub activo: bool,
}

impl ServicioAdicional {
    /// Lighting services are recognised by name ("luz", case-insensitive)
    pub fn es_luz(&self) -> bool {
        self.nombre.to_lowercase().contains("luz")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServicio {
    pub nombre: String,
    pub precio_actual: i64,
    #[serde(default = "default_true")]
    pub activo: bool,
}

impl NewServicio {
    pub fn validate(&self) -> CatalogResult<()> {
        require_text("nombre", &self.nombre)?;
        if self.precio_actual < 0 {
            return Err(CatalogError::InvalidPrice(self.precio_actual));
        }
        Ok(())
    }
}

/// Facility client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cliente {
    pub id: ClienteId,
    pub nombre: String,
    pub apellido: Option<String>,
    pub telefono: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCliente {
    pub nombre: String,
    #[serde(default)]
    pub apellido: Option<String>,
    pub telefono: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewCliente {
    pub fn new(nombre: impl Into<String>, telefono: impl Into<String>) -> Self {
        Self {
            nombre: nombre.into(),
            apellido: None,
            telefono: telefono.into(),
            email: None,
        }
    }

    pub fn validate(&self) -> CatalogResult<()> {
        require_text("nombre", &self.nombre)?;
        require_text("telefono", &self.telefono)?;
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(CatalogError::InvalidField {
                    field: "email",
                    reason: "debe contener '@'".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn require_text(field: &'static str, value: &str) -> CatalogResult<()> {
    if value.trim().is_empty() {
        return Err(CatalogError::InvalidField {
            field,
            reason: "no puede estar vacío".to_string(),
        });
    }
    Ok(())
}
