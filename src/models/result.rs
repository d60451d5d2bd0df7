//! Session results, one table per kind of session
//!
//! - race and sprint race results → `raceResults`
//! - qualifying and sprint qualifying results → `qualifyingResults`
//! - practice results → `practiceResults`
//!
//! The table is chosen from the title segment of the result's `eventId`.

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::ids::EventType;
use crate::record::{Field, Predicate, Record, RecordSchema};
use crate::storage::router::{Family, Router, Variant};
use crate::{Error, Result};

/// Result table of the family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultTable {
    Race,
    Qualifying,
    Practice,
}

impl ResultTable {
    pub fn for_event(event_type: EventType) -> Self {
        match event_type {
            EventType::Race | EventType::SprintRace => ResultTable::Race,
            EventType::Qualifying | EventType::SprintQualifying => ResultTable::Qualifying,
            EventType::Practice => ResultTable::Practice,
        }
    }

    /// Classify a stored event id
    pub fn for_event_id(event_id: &str) -> Result<Self> {
        Ok(Self::for_event(EventType::of_event_id(event_id)?))
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            ResultTable::Race => "raceResults",
            ResultTable::Qualifying => "qualifyingResults",
            ResultTable::Practice => "practiceResults",
        }
    }
}

/// Columns every result carries, in leading position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCore {
    pub event_id: String,
    pub position: i64,
    pub driver_id: String,
    #[serde(default)]
    pub driver_number: Option<i64>,
    #[serde(default)]
    pub laps: Option<i64>,
    #[serde(default)]
    pub constructor_id: Option<String>,
}

impl ResultCore {
    const FIELD_COUNT: usize = 6;

    pub fn new(event_id: impl Into<String>, position: i64, driver_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            position,
            driver_id: driver_id.into(),
            driver_number: None,
            laps: None,
            constructor_id: None,
        }
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.event_id.clone().into(),
            self.position.into(),
            self.driver_id.clone().into(),
            self.driver_number.into(),
            self.laps.into(),
            self.constructor_id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            event_id: row.get(0)?,
            position: row.get(1)?,
            driver_id: row.get(2)?,
            driver_number: row.get(3)?,
            laps: row.get(4)?,
            constructor_id: row.get(5)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    #[serde(flatten)]
    pub core: ResultCore,
    #[serde(default)]
    pub points: f64,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualifyingResult {
    #[serde(flatten)]
    pub core: ResultCore,
    #[serde(default)]
    pub q1: Option<String>,
    #[serde(default)]
    pub q2: Option<String>,
    #[serde(default)]
    pub q3: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeResult {
    #[serde(flatten)]
    pub core: ResultCore,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub gap: Option<String>,
}

impl Record for RaceResult {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "RaceResult",
        fields: &[
            Field::text("eventId"),
            Field::integer("position"),
            Field::text("driverId"),
            Field::integer("driverNumber"),
            Field::integer("laps"),
            Field::text("constructorId"),
            Field::real("points"),
            Field::text("time"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        let mut values = self.core.values();
        values.push(self.points.into());
        values.push(self.time.clone().into());
        values
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let n = ResultCore::FIELD_COUNT;
        Ok(Self {
            core: ResultCore::from_row(row)?,
            points: row.get(n)?,
            time: row.get(n + 1)?,
        })
    }
}

impl Record for QualifyingResult {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "QualifyingResult",
        fields: &[
            Field::text("eventId"),
            Field::integer("position"),
            Field::text("driverId"),
            Field::integer("driverNumber"),
            Field::integer("laps"),
            Field::text("constructorId"),
            Field::text("q1"),
            Field::text("q2"),
            Field::text("q3"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        let mut values = self.core.values();
        values.extend([self.q1.clone(), self.q2.clone(), self.q3.clone()].map(Value::from));
        values
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let n = ResultCore::FIELD_COUNT;
        Ok(Self {
            core: ResultCore::from_row(row)?,
            q1: row.get(n)?,
            q2: row.get(n + 1)?,
            q3: row.get(n + 2)?,
        })
    }
}

impl Record for PracticeResult {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "PracticeResult",
        fields: &[
            Field::text("eventId"),
            Field::integer("position"),
            Field::text("driverId"),
            Field::integer("driverNumber"),
            Field::integer("laps"),
            Field::text("constructorId"),
            Field::text("time"),
            Field::text("gap"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        let mut values = self.core.values();
        values.push(self.time.clone().into());
        values.push(self.gap.clone().into());
        values
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let n = ResultCore::FIELD_COUNT;
        Ok(Self {
            core: ResultCore::from_row(row)?,
            time: row.get(n)?,
            gap: row.get(n + 1)?,
        })
    }
}

/// Any session result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResultRecord {
    Race(RaceResult),
    Qualifying(QualifyingResult),
    Practice(PracticeResult),
}

impl ResultRecord {
    pub fn core(&self) -> &ResultCore {
        match self {
            ResultRecord::Race(r) => &r.core,
            ResultRecord::Qualifying(r) => &r.core,
            ResultRecord::Practice(r) => &r.core,
        }
    }

    /// Table this variant is stored in
    pub fn table(&self) -> ResultTable {
        match self {
            ResultRecord::Race(_) => ResultTable::Race,
            ResultRecord::Qualifying(_) => ResultTable::Qualifying,
            ResultRecord::Practice(_) => ResultTable::Practice,
        }
    }

    /// Build the variant matching the mapping's `eventId`
    pub fn from_map(map: Map<String, serde_json::Value>) -> Result<Self> {
        let table = map
            .get("eventId")
            .and_then(|v| v.as_str())
            .map(ResultTable::for_event_id)
            .ok_or_else(|| Error::Schema("result mapping has no eventId".to_string()))??;

        let value = serde_json::Value::Object(map);
        let record = match table {
            ResultTable::Race => ResultRecord::Race(serde_json::from_value(value)?),
            ResultTable::Qualifying => ResultRecord::Qualifying(serde_json::from_value(value)?),
            ResultTable::Practice => ResultRecord::Practice(serde_json::from_value(value)?),
        };
        Ok(record)
    }
}

impl Variant<ResultRecord> for RaceResult {
    fn wrap(self) -> ResultRecord {
        ResultRecord::Race(self)
    }

    fn peel(record: &ResultRecord) -> Option<&Self> {
        match record {
            ResultRecord::Race(r) => Some(r),
            _ => None,
        }
    }
}

impl Variant<ResultRecord> for QualifyingResult {
    fn wrap(self) -> ResultRecord {
        ResultRecord::Qualifying(self)
    }

    fn peel(record: &ResultRecord) -> Option<&Self> {
        match record {
            ResultRecord::Qualifying(r) => Some(r),
            _ => None,
        }
    }
}

impl Variant<ResultRecord> for PracticeResult {
    fn wrap(self) -> ResultRecord {
        ResultRecord::Practice(self)
    }

    fn peel(record: &ResultRecord) -> Option<&Self> {
        match record {
            ResultRecord::Practice(r) => Some(r),
            _ => None,
        }
    }
}

/// Discriminant rules of the results family: the event id's title
pub struct Results;

impl Family for Results {
    type Record = ResultRecord;
    type Slot = ResultTable;

    fn slot_of(record: &ResultRecord) -> Result<ResultTable> {
        let table = ResultTable::for_event_id(&record.core().event_id)?;
        if table != record.table() {
            return Err(Error::Routing(format!(
                "{} belongs in {}, not {}",
                record.core().event_id,
                table.table_name(),
                record.table().table_name()
            )));
        }
        Ok(table)
    }

    fn slot_for(predicate: &Predicate) -> Result<Option<ResultTable>> {
        predicate
            .get_text("eventId")
            .map(ResultTable::for_event_id)
            .transpose()
    }
}

impl Router<Results> {
    /// All results of one session, read from the single table its id routes to
    pub fn get_by_event_id(&self, event_id: &str) -> Result<Vec<ResultRecord>> {
        self.get_by_keys_many(&Predicate::new().eq("eventId", event_id.to_string()))
    }
}
