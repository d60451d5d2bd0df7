//! Race event (session) record

use rusqlite::types::{Type, Value};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, EventType};
use crate::record::{Field, Record, RecordSchema};

/// One session of a race weekend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceEvent {
    pub race_id: String,
    pub title: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "type_", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub gmt_offset: Option<String>,
    #[serde(rename = "id_", default)]
    pub id: String,
}

impl RaceEvent {
    pub fn new(race_id: impl Into<String>, title: impl Into<String>) -> Self {
        let mut event = Self {
            race_id: race_id.into(),
            title: title.into(),
            date: None,
            event_type: EventType::Race,
            time: None,
            gmt_offset: None,
            id: String::new(),
        };
        event.refresh_derived();
        event
    }

    /// Recompute `id_` and `type_` from race id and title
    pub fn refresh_derived(&mut self) {
        self.id = EventId::format(&self.race_id, &self.title);
        self.event_type = EventType::classify(&self.title);
    }
}

impl Record for RaceEvent {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "RaceEvent",
        fields: &[
            Field::text("raceId"),
            Field::text("title"),
            Field::text("date"),
            Field::text("type_"),
            Field::text("time"),
            Field::text("gmtOffset"),
            Field::text("id_"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.race_id.clone().into(),
            self.title.clone().into(),
            self.date.clone().into(),
            self.event_type.as_str().to_string().into(),
            self.time.clone().into(),
            self.gmt_offset.clone().into(),
            self.id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let type_str: String = row.get(3)?;
        let event_type: EventType = type_str.parse().map_err(|e: crate::Error| {
            rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e))
        })?;

        Ok(Self {
            race_id: row.get(0)?,
            title: row.get(1)?,
            date: row.get(2)?,
            event_type,
            time: row.get(4)?,
            gmt_offset: row.get(5)?,
            id: row.get(6)?,
        })
    }
}
