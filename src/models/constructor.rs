//! Constructor (team) record

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::{IdResolver, resolve};
use crate::Result;
use crate::record::{Field, Record, RecordSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constructor {
    pub name: String,
    #[serde(rename = "id_")]
    pub id: String,
}

impl Constructor {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self { name: name.into(), id: id.into() }
    }

    /// Build a constructor whose id is resolved from its display name
    pub fn resolved(name: impl Into<String>, resolver: &dyn IdResolver) -> Result<Self> {
        let name = name.into();
        let id = resolve(resolver, "Constructor", &name)?;
        Ok(Self { name, id })
    }
}

impl Record for Constructor {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "Constructor",
        fields: &[Field::text("name"), Field::text("id_")],
    };

    fn values(&self) -> Vec<Value> {
        vec![self.name.clone().into(), self.id.clone().into()]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { name: row.get(0)?, id: row.get(1)? })
    }
}
