//! Driver record

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::record::{Field, Record, RecordSchema};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub name: String,
    pub short_name: String,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub constructor_id: Option<String>,
    #[serde(rename = "id_")]
    pub id: String,
}

impl Record for Driver {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "Driver",
        fields: &[
            Field::text("name"),
            Field::text("shortName"),
            Field::text("nationality"),
            Field::text("constructorId"),
            Field::text("id_"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.short_name.clone().into(),
            self.nationality.clone().into(),
            self.constructor_id.clone().into(),
            self.id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            short_name: row.get(1)?,
            nationality: row.get(2)?,
            constructor_id: row.get(3)?,
            id: row.get(4)?,
        })
    }
}
