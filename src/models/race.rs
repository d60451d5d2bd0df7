//! Race (weekend) record

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::ids::RaceId;
use crate::record::{Field, Record, RecordSchema};

/// One round of a season; `id_` is always `<year>_<round>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    #[serde(default)]
    pub f1_id: Option<String>,
    pub year: i64,
    #[serde(rename = "round_")]
    pub round: i64,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub track_map: Option<String>,
    pub circuit_id: String,
    #[serde(rename = "id_", default)]
    pub id: String,
}

impl Race {
    pub fn new(
        year: i64,
        round: i64,
        name: impl Into<String>,
        circuit_id: impl Into<String>,
    ) -> Self {
        let mut race = Self {
            f1_id: None,
            year,
            round,
            name: name.into(),
            location: None,
            track_map: None,
            circuit_id: circuit_id.into(),
            id: String::new(),
        };
        race.refresh_id();
        race
    }

    /// Recompute `id_` from year and round
    pub fn refresh_id(&mut self) {
        self.id = format!("{}_{}", self.year, self.round);
    }

    pub fn race_id(&self) -> crate::Result<RaceId> {
        RaceId::parse(&self.id)
    }
}

impl Record for Race {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "Race",
        fields: &[
            Field::text("f1Id"),
            Field::integer("year"),
            Field::integer("round_"),
            Field::text("name"),
            Field::text("location"),
            Field::text("trackMap"),
            Field::text("circuitId"),
            Field::text("id_"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.f1_id.clone().into(),
            self.year.into(),
            self.round.into(),
            self.name.clone().into(),
            self.location.clone().into(),
            self.track_map.clone().into(),
            self.circuit_id.clone().into(),
            self.id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            f1_id: row.get(0)?,
            year: row.get(1)?,
            round: row.get(2)?,
            name: row.get(3)?,
            location: row.get(4)?,
            track_map: row.get(5)?,
            circuit_id: row.get(6)?,
            id: row.get(7)?,
        })
    }
}
