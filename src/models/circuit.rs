//! Circuit record

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use super::{IdResolver, resolve};
use crate::Result;
use crate::record::{Field, Record, RecordSchema};

/// A track, identified by the id its name resolves to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Circuit {
    pub name: String,
    pub number_of_laps: i64,
    /// Lap length in km
    pub length: f64,
    /// Race distance in km
    pub race_distance: f64,
    #[serde(default)]
    pub lap_record: Option<String>,
    #[serde(default)]
    pub first_grand_prix: Option<i64>,
    #[serde(rename = "id_")]
    pub id: String,
}

impl Circuit {
    /// Build a circuit whose id is resolved from its name
    pub fn resolved(
        name: impl Into<String>,
        number_of_laps: i64,
        length: f64,
        race_distance: f64,
        resolver: &dyn IdResolver,
    ) -> Result<Self> {
        let name = name.into();
        let id = resolve(resolver, "Circuit", &name)?;
        Ok(Self {
            name,
            number_of_laps,
            length,
            race_distance,
            lap_record: None,
            first_grand_prix: None,
            id,
        })
    }
}

impl Record for Circuit {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "Circuit",
        fields: &[
            Field::text("name"),
            Field::integer("numberOfLaps"),
            Field::real("length"),
            Field::real("raceDistance"),
            Field::text("lapRecord"),
            Field::integer("firstGrandPrix"),
            Field::text("id_"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.number_of_laps.into(),
            self.length.into(),
            self.race_distance.into(),
            self.lap_record.clone().into(),
            self.first_grand_prix.into(),
            self.id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            name: row.get(0)?,
            number_of_laps: row.get(1)?,
            length: row.get(2)?,
            race_distance: row.get(3)?,
            lap_record: row.get(4)?,
            first_grand_prix: row.get(5)?,
            id: row.get(6)?,
        })
    }
}
