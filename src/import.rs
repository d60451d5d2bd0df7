//! Collector bundle ingestion
//!
//! A bundle is one JSON object with optional arrays of plain mappings:
//!
//! ```json
//! { "circuits": [...], "constructors": [...], "drivers": [...],
//!   "races": [...], "events": [...], "results": [...], "standings": [...] }
//! ```
//!
//! Families are upserted parents first and committed one at a time.

use std::fmt;
use std::path::Path;

use serde::Deserialize;
use serde_json::Map;

use crate::models::{
    Circuit, Constructor, Driver, Race, RaceEvent, ResultRecord, StandingsRecord,
};
use crate::storage::{Store, UpsertSummary};
use crate::Result;

type Mapping = Map<String, serde_json::Value>;

/// Raw collector output
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Bundle {
    pub circuits: Vec<Circuit>,
    pub constructors: Vec<Constructor>,
    pub drivers: Vec<Driver>,
    pub races: Vec<Race>,
    pub events: Vec<RaceEvent>,
    pub results: Vec<Mapping>,
    pub standings: Vec<Mapping>,
}

impl Bundle {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        self.circuits.is_empty()
            && self.constructors.is_empty()
            && self.drivers.is_empty()
            && self.races.is_empty()
            && self.events.is_empty()
            && self.results.is_empty()
            && self.standings.is_empty()
    }
}

pub fn load_bundle(path: &Path) -> Result<Bundle> {
    let contents = std::fs::read_to_string(path)?;
    Bundle::from_json(&contents)
}

/// Upsert outcome per family, in write order
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub families: Vec<(&'static str, UpsertSummary)>,
}

impl ImportReport {
    pub fn total(&self) -> UpsertSummary {
        let mut total = UpsertSummary::default();
        for (_, summary) in &self.families {
            total.merge(*summary);
        }
        total
    }

    pub fn get(&self, family: &str) -> Option<UpsertSummary> {
        self.families.iter().find(|(name, _)| *name == family).map(|(_, s)| *s)
    }
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (family, summary) in &self.families {
            writeln!(f, "  {}: {}", family, summary)?;
        }
        write!(f, "  total: {}", self.total())
    }
}

/// Write every family of the bundle, committing after each one.
///
/// A failing family is rolled back; families committed before it stay.
pub fn import(store: &Store, bundle: &Bundle) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    let races: Vec<Race> = bundle
        .races
        .iter()
        .cloned()
        .map(|mut race| {
            race.refresh_id();
            race
        })
        .collect();
    let events: Vec<RaceEvent> = bundle
        .events
        .iter()
        .cloned()
        .map(|mut event| {
            event.refresh_derived();
            event
        })
        .collect();
    let results = bundle
        .results
        .iter()
        .cloned()
        .map(ResultRecord::from_map)
        .collect::<Result<Vec<_>>>()?;
    let standings = bundle
        .standings
        .iter()
        .cloned()
        .map(StandingsRecord::from_map)
        .collect::<Result<Vec<_>>>()?;

    stage(store, &mut report, "circuits", bundle.circuits.len(), || {
        store.circuits().insert_or_update_many(&bundle.circuits)
    })?;
    stage(store, &mut report, "constructors", bundle.constructors.len(), || {
        store.constructors().insert_or_update_many(&bundle.constructors)
    })?;
    stage(store, &mut report, "drivers", bundle.drivers.len(), || {
        store.drivers().insert_or_update_many(&bundle.drivers)
    })?;
    stage(store, &mut report, "races", races.len(), || {
        store.races().insert_or_update_many(&races)
    })?;
    stage(store, &mut report, "events", events.len(), || {
        store.events().insert_or_update_many(&events)
    })?;
    stage(store, &mut report, "results", results.len(), || {
        store.results().insert_or_update_many(&results)
    })?;
    stage(store, &mut report, "standings", standings.len(), || {
        store.standings().insert_or_update_many(&standings)
    })?;

    tracing::info!("Imported {}", report.total());
    Ok(report)
}

fn stage<F>(
    store: &Store,
    report: &mut ImportReport,
    family: &'static str,
    len: usize,
    write: F,
) -> Result<()>
where
    F: FnOnce() -> Result<UpsertSummary>,
{
    if len == 0 {
        return Ok(());
    }

    match write() {
        Ok(summary) => {
            store.commit()?;
            tracing::info!("{}: {}", family, summary);
            report.families.push((family, summary));
            Ok(())
        }
        Err(e) => {
            tracing::warn!("{} failed, rolling back: {}", family, e);
            store.rollback()?;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::ResultTable;
    use crate::storage::TableEntry;

    const BUNDLE: &str = r#"{
        "circuits": [{
            "name": "Albert Park Circuit", "numberOfLaps": 58, "length": 5.278,
            "raceDistance": 306.124, "id_": "albert_park"
        }],
        "constructors": [{ "name": "Red Bull Racing", "id_": "red_bull" }],
        "drivers": [{
            "name": "Max Verstappen", "shortName": "VER",
            "constructorId": "red_bull", "id_": "max_verstappen"
        }],
        "races": [{
            "year": 2023, "round_": 3, "name": "Australian Grand Prix",
            "circuitId": "albert_park", "id_": "stale"
        }],
        "events": [
            { "raceId": "2023_3", "title": "Race" },
            { "raceId": "2023_3", "title": "Qualifying" },
            { "raceId": "2023_3", "title": "Practice 2" }
        ],
        "results": [
            { "eventId": "2023_3_RACE", "position": 1, "driverId": "max_verstappen", "points": 25 },
            { "eventId": "2023_3_QUALIFYING", "position": 1, "driverId": "max_verstappen", "q3": "1:16.732" },
            { "eventId": "2023_3_PRACTICE_2", "position": 3, "driverId": "max_verstappen", "gap": "+0.390" }
        ],
        "standings": [
            { "year": 2023, "position": 1, "points": 69, "driverId": "max_verstappen" },
            { "year": 2023, "position": 1, "points": 113, "constructorId": "red_bull" }
        ]
    }"#;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    #[test]
    fn test_import_bundle() {
        let store = store();
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        let report = import(&store, &bundle).unwrap();

        assert_eq!(report.families.len(), 7);
        assert_eq!(report.total().inserted, 12);

        let race = &store.races().get_all().unwrap()[0];
        assert_eq!(race.id, "2023_3");

        let ids: Vec<String> = store.events().get_all().unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["2023_3_RACE", "2023_3_QUALIFYING", "2023_3_PRACTICE_2"]);

        let tables: Vec<ResultTable> =
            store.results().get_all().unwrap().iter().map(|r| r.table()).collect();
        assert_eq!(
            tables,
            vec![ResultTable::Race, ResultTable::Qualifying, ResultTable::Practice]
        );
        assert_eq!(store.standings().get_all().unwrap().len(), 2);
    }

    #[test]
    fn test_reimport_updates() {
        let store = store();
        let bundle = Bundle::from_json(BUNDLE).unwrap();
        import(&store, &bundle).unwrap();

        let report = import(&store, &bundle).unwrap();
        assert_eq!(report.total().inserted, 0);
        assert_eq!(report.total().updated, 12);
        assert_eq!(report.get("events").map(|s| s.updated), Some(3));
    }

    #[test]
    fn test_failing_family_is_rolled_back() {
        let store = store();
        let bundle = Bundle::from_json(
            r#"{
                "constructors": [{ "name": "Ferrari", "id_": "ferrari" }],
                "drivers": [{ "name": "Nobody", "shortName": "NOB", "constructorId": "missing", "id_": "nobody" }]
            }"#,
        )
        .unwrap();

        let err = import(&store, &bundle).unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(store.constructors().count().unwrap(), 1);
        assert_eq!(store.drivers().count().unwrap(), 0);
    }

    #[test]
    fn test_unclassifiable_standings_are_rejected() {
        let store = store();
        let bundle = Bundle::from_json(r#"{ "standings": [{ "year": 2023, "position": 1 }] }"#).unwrap();
        assert!(matches!(import(&store, &bundle), Err(Error::Schema(_))));
    }

    #[test]
    fn test_empty_bundle() {
        let bundle = Bundle::from_json("{}").unwrap();
        assert!(bundle.is_empty());
        let report = import(&store(), &bundle).unwrap();
        assert_eq!(report.total().total(), 0);
    }

    #[test]
    fn test_load_bundle_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, BUNDLE).unwrap();
        let bundle = load_bundle(&path).unwrap();
        assert_eq!(bundle.events.len(), 3);
    }
}
