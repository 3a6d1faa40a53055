//! Team data models.

use serde::{Deserialize, Serialize};

use super::errors::{EquipoError, EquipoResult};
use crate::catalog::ClienteId;

/// Equipo ID type
pub type EquipoId = i64;

/// Team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipo {
    pub id: EquipoId,
    pub nombre_equipo: String,
    pub id_capitan: Option<ClienteId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEquipo {
    pub nombre_equipo: String,
    #[serde(default)]
    pub id_capitan: Option<ClienteId>,
}

impl NewEquipo {
    pub fn validate(&self) -> EquipoResult<()> {
        if self.nombre_equipo.trim().is_empty() {
            return Err(EquipoError::InvalidName);
        }
        Ok(())
    }
}

/// Roster entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EquipoMiembro {
    pub id_equipo: EquipoId,
    pub id_cliente: ClienteId,
}

/// Per-client outcome of adding a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum MemberAddOutcome {
    Agregado,
    YaMiembro,
    ClienteNoEncontrado,
    Fallido { motivo: String },
}

/// Per-client outcome of removing a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "resultado", rename_all = "snake_case")]
pub enum MemberRemoveOutcome {
    Eliminado,
    NoMiembro,
    Fallido { motivo: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_name_rejected() {
        let equipo = NewEquipo {
            nombre_equipo: "   ".into(),
            id_capitan: None,
        };
        assert!(matches!(equipo.validate(), Err(EquipoError::InvalidName)));
    }

    #[test]
    fn test_outcome_wire_format() {
        let json = serde_json::to_value(MemberAddOutcome::ClienteNoEncontrado).unwrap();
        assert_eq!(json["resultado"], "cliente_no_encontrado");
        let json = serde_json::to_value(MemberRemoveOutcome::NoMiembro).unwrap();
        assert_eq!(json["resultado"], "no_miembro");
    }
}
