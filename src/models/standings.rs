//! Championship standings: one table for drivers, one for constructors

use rusqlite::types::Value;
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::record::{Field, Predicate, Record, RecordSchema};
use crate::storage::router::{Family, Variant};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandingsKind {
    Driver,
    Constructor,
}

impl StandingsKind {
    pub fn table_name(&self) -> &'static str {
        match self {
            StandingsKind::Driver => "driverStandings",
            StandingsKind::Constructor => "constructorStandings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStanding {
    pub year: i64,
    pub position: i64,
    #[serde(default)]
    pub points: f64,
    pub driver_id: String,
    #[serde(default)]
    pub constructor_id: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorStanding {
    pub year: i64,
    pub position: i64,
    #[serde(default)]
    pub points: f64,
    pub constructor_id: String,
}

impl Record for DriverStanding {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "DriverStanding",
        fields: &[
            Field::integer("year"),
            Field::integer("position"),
            Field::real("points"),
            Field::text("driverId"),
            Field::text("constructorId"),
            Field::text("nationality"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.year.into(),
            self.position.into(),
            self.points.into(),
            self.driver_id.clone().into(),
            self.constructor_id.clone().into(),
            self.nationality.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            year: row.get(0)?,
            position: row.get(1)?,
            points: row.get(2)?,
            driver_id: row.get(3)?,
            constructor_id: row.get(4)?,
            nationality: row.get(5)?,
        })
    }
}

impl Record for ConstructorStanding {
    const SCHEMA: RecordSchema = RecordSchema {
        name: "ConstructorStanding",
        fields: &[
            Field::integer("year"),
            Field::integer("position"),
            Field::real("points"),
            Field::text("constructorId"),
        ],
    };

    fn values(&self) -> Vec<Value> {
        vec![
            self.year.into(),
            self.position.into(),
            self.points.into(),
            self.constructor_id.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            year: row.get(0)?,
            position: row.get(1)?,
            points: row.get(2)?,
            constructor_id: row.get(3)?,
        })
    }
}

/// Any standings row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StandingsRecord {
    Driver(DriverStanding),
    Constructor(ConstructorStanding),
}

impl StandingsRecord {
    pub fn kind(&self) -> StandingsKind {
        match self {
            StandingsRecord::Driver(_) => StandingsKind::Driver,
            StandingsRecord::Constructor(_) => StandingsKind::Constructor,
        }
    }

    pub fn year(&self) -> i64 {
        match self {
            StandingsRecord::Driver(s) => s.year,
            StandingsRecord::Constructor(s) => s.year,
        }
    }

    pub fn position(&self) -> i64 {
        match self {
            StandingsRecord::Driver(s) => s.position,
            StandingsRecord::Constructor(s) => s.position,
        }
    }

    /// Driver standings when the mapping names a driver, constructor standings
    /// when it only names a constructor
    pub fn from_map(map: Map<String, serde_json::Value>) -> Result<Self> {
        let has = |key: &str| map.get(key).is_some_and(|v| !v.is_null());
        let kind = if has("driverId") {
            StandingsKind::Driver
        } else if has("constructorId") {
            StandingsKind::Constructor
        } else {
            return Err(Error::Schema(
                "standings mapping has neither driverId nor constructorId".to_string(),
            ));
        };

        let value = serde_json::Value::Object(map);
        Ok(match kind {
            StandingsKind::Driver => StandingsRecord::Driver(serde_json::from_value(value)?),
            StandingsKind::Constructor => {
                StandingsRecord::Constructor(serde_json::from_value(value)?)
            }
        })
    }
}

impl Variant<StandingsRecord> for DriverStanding {
    fn wrap(self) -> StandingsRecord {
        StandingsRecord::Driver(self)
    }

    fn peel(record: &StandingsRecord) -> Option<&Self> {
        match record {
            StandingsRecord::Driver(s) => Some(s),
            _ => None,
        }
    }
}

impl Variant<StandingsRecord> for ConstructorStanding {
    fn wrap(self) -> StandingsRecord {
        StandingsRecord::Constructor(self)
    }

    fn peel(record: &StandingsRecord) -> Option<&Self> {
        match record {
            StandingsRecord::Constructor(s) => Some(s),
            _ => None,
        }
    }
}

/// Discriminant rules of the standings family: the subject kind
pub struct Standings;

impl Family for Standings {
    type Record = StandingsRecord;
    type Slot = StandingsKind;

    fn slot_of(record: &StandingsRecord) -> Result<StandingsKind> {
        Ok(record.kind())
    }

    fn slot_for(predicate: &Predicate) -> Result<Option<StandingsKind>> {
        Ok(predicate.contains("driverId").then_some(StandingsKind::Driver))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_from_map_driver() {
        let record = StandingsRecord::from_map(map(json!({
            "year": 2023,
            "position": 1,
            "points": 575,
            "driverId": "max_verstappen",
            "constructorId": "red_bull",
            "nationality": "NED",
        })))
        .unwrap();
        assert_eq!(record.kind(), StandingsKind::Driver);
        assert_eq!(record.year(), 2023);
    }

    #[test]
    fn test_from_map_constructor() {
        let record = StandingsRecord::from_map(map(json!({
            "year": 2023,
            "position": 2,
            "points": 409,
            "constructorId": "mercedes",
        })))
        .unwrap();
        assert_eq!(record.kind(), StandingsKind::Constructor);
        assert_eq!(record.position(), 2);
    }

    #[test]
    fn test_from_map_without_subject() {
        let err = StandingsRecord::from_map(map(json!({ "year": 2023, "position": 1 })));
        assert!(matches!(err, Err(Error::Schema(_))));
    }

    #[test]
    fn test_slot_for_driver_predicate() {
        let by_driver = Predicate::new().eq("driverId", "max_verstappen".to_string());
        assert_eq!(Standings::slot_for(&by_driver).unwrap(), Some(StandingsKind::Driver));

        let by_key = Predicate::new().eq("year", 2023i64).eq("position", 1i64);
        assert_eq!(Standings::slot_for(&by_key).unwrap(), None);
    }
}
