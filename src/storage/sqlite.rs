//! SQLite persistence facade
//!
//! Owns the connection, one mapper per entity and one router per polymorphic
//! family, and exposes schema lifecycle and transaction control over all of
//! them. Writes accumulate in an open transaction until `commit()`.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use rusqlite::Connection;
use rusqlite::types::Value;

use super::deps::DependencyGraph;
use super::router::Router;
use super::schema::{ForeignKey, Index};
use super::table::{Table, TableEntry};
use crate::models::{
    Circuit, Constructor, ConstructorStanding, Driver, DriverStanding, PracticeResult,
    QualifyingResult, Race, RaceEvent, RaceResult, ResultTable, Results, Standings, StandingsKind,
};
use crate::record::Record;
use crate::{Error, Result};

/// SQLite-backed store of every entity
pub struct Store {
    conn: Rc<Connection>,
    circuits: Table<Circuit>,
    constructors: Table<Constructor>,
    drivers: Table<Driver>,
    races: Table<Race>,
    events: Table<RaceEvent>,
    results: Router<Results>,
    standings: Router<Standings>,
    /// Table names in creation order, fixed at open
    order: Vec<String>,
}

impl Store {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        tracing::info!("Opening store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // foreign_keys is a no-op inside a transaction, so it goes first
        conn.execute_batch("PRAGMA foreign_keys = ON; BEGIN")?;
        let conn = Rc::new(conn);

        let mut store = Self {
            circuits: circuit_table(&conn)?,
            constructors: constructor_table(&conn)?,
            drivers: driver_table(&conn)?,
            races: race_table(&conn)?,
            events: event_table(&conn)?,
            results: result_router(&conn)?,
            standings: standings_router(&conn)?,
            order: Vec::new(),
            conn,
        };
        store.order = store.dependency_graph()?.creation_order()?;
        tracing::debug!("Creation order: {}", store.order.join(", "));
        Ok(store)
    }

    // ========== Entities ==========

    pub fn circuits(&self) -> &Table<Circuit> {
        &self.circuits
    }

    pub fn constructors(&self) -> &Table<Constructor> {
        &self.constructors
    }

    pub fn drivers(&self) -> &Table<Driver> {
        &self.drivers
    }

    pub fn races(&self) -> &Table<Race> {
        &self.races
    }

    pub fn events(&self) -> &Table<RaceEvent> {
        &self.events
    }

    pub fn results(&self) -> &Router<Results> {
        &self.results
    }

    pub fn standings(&self) -> &Router<Standings> {
        &self.standings
    }

    // ========== Schema lifecycle ==========

    /// Every physical table, in declaration order
    pub fn entries(&self) -> Vec<&dyn TableEntry> {
        let mut entries: Vec<&dyn TableEntry> = vec![
            &self.races,
            &self.events,
            &self.circuits,
            &self.constructors,
            &self.drivers,
        ];
        entries.extend(self.results.entries());
        entries.extend(self.standings.entries());
        entries
    }

    pub fn dependency_graph(&self) -> Result<DependencyGraph> {
        DependencyGraph::from_entries(&self.entries())
    }

    /// Physical tables in creation order
    pub fn tables(&self) -> Result<Vec<&dyn TableEntry>> {
        let entries = self.entries();
        let mut sorted = Vec::with_capacity(entries.len());
        for name in &self.order {
            let entry = entries
                .iter()
                .find(|e| e.table_name() == name)
                .ok_or_else(|| Error::Schema(format!("Unknown table in order: {}", name)))?;
            sorted.push(*entry);
        }
        Ok(sorted)
    }

    /// Create every table (parents first) and its indexes
    pub fn initialize(&self) -> Result<()> {
        tracing::info!("Initializing schema");
        for entry in self.tables()? {
            entry.initialize()?;
        }
        Ok(())
    }

    pub fn create_tables(&self) -> Result<()> {
        for entry in self.tables()? {
            entry.create_table()?;
        }
        Ok(())
    }

    /// Drop every table, children first
    pub fn drop_tables(&self) -> Result<()> {
        tracing::info!("Dropping all tables");
        for entry in self.tables()?.into_iter().rev() {
            entry.drop_table()?;
        }
        Ok(())
    }

    /// Drop everything, then re-create tables and indexes
    pub fn reset_tables(&self) -> Result<()> {
        tracing::info!("Resetting all tables");
        let tables = self.tables()?;
        for entry in tables.iter().rev() {
            entry.drop_table()?;
        }
        for entry in &tables {
            entry.initialize()?;
        }
        Ok(())
    }

    // ========== Transactions ==========

    /// Make pending writes durable and open the next transaction
    pub fn commit(&self) -> Result<()> {
        tracing::info!("Committing");
        self.end_transaction("COMMIT")
    }

    /// Discard pending writes
    pub fn rollback(&self) -> Result<()> {
        tracing::debug!("Rolling back");
        self.end_transaction("ROLLBACK")
    }

    /// SQLite may already have ended the transaction itself (e.g. after a
    /// statement-level abort); only the `BEGIN` is issued then.
    fn end_transaction(&self, verb: &str) -> Result<()> {
        if self.conn.is_autocommit() {
            tracing::warn!("No open transaction to {}; starting a new one", verb);
            self.conn.execute_batch("BEGIN")?;
        } else {
            self.conn.execute_batch(&format!("{}; BEGIN", verb))?;
        }
        Ok(())
    }

    /// Close the store; uncommitted writes are discarded
    pub fn close(self) -> Result<()> {
        let conn = Rc::clone(&self.conn);
        drop(self);

        match Rc::try_unwrap(conn) {
            Ok(conn) => {
                if !conn.is_autocommit() {
                    conn.execute_batch("ROLLBACK")?;
                }
                conn.close().map_err(|(_, e)| e.into())
            }
            // no other handle escapes the store; nothing left to do if one did
            Err(_) => Ok(()),
        }
    }

    // ========== Ad-hoc ==========

    /// Run a read statement and return every row as raw values
    pub fn raw(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Row count of every physical table, in creation order
    pub fn stats(&self) -> Result<StoreStats> {
        let mut tables = Vec::new();
        for entry in self.tables()? {
            tables.push((entry.table_name().to_string(), entry.count()?));
        }
        Ok(StoreStats { tables })
    }
}

// ========== Table wiring ==========

fn circuit_table(conn: &Rc<Connection>) -> Result<Table<Circuit>> {
    Table::<Circuit>::new(conn.clone(), "circuits", &["id_"])
}

fn constructor_table(conn: &Rc<Connection>) -> Result<Table<Constructor>> {
    Table::<Constructor>::new(conn.clone(), "constructors", &["id_"])
}

fn driver_table(conn: &Rc<Connection>) -> Result<Table<Driver>> {
    Table::<Driver>::new(conn.clone(), "drivers", &["id_"])?.with_foreign_keys(vec![
        ForeignKey::between::<Driver, Constructor>("constructorId", "constructors", "id_")?,
    ])
}

fn race_table(conn: &Rc<Connection>) -> Result<Table<Race>> {
    Table::<Race>::new(conn.clone(), "races", &["id_"])?
        .with_foreign_keys(vec![ForeignKey::between::<Race, Circuit>(
            "circuitId",
            "circuits",
            "id_",
        )?])?
        .with_indexes(vec![Index::of::<Race>("circuitIndex", "races", &["circuitId"])?])
}

fn event_table(conn: &Rc<Connection>) -> Result<Table<RaceEvent>> {
    Table::<RaceEvent>::new(conn.clone(), "events", &["id_"])?
        .with_foreign_keys(vec![ForeignKey::between::<RaceEvent, Race>(
            "raceId", "races", "id_",
        )?])?
        .with_indexes(vec![Index::of::<RaceEvent>("raceIndex", "events", &["raceId"])?])
}

/// One results table: keyed by (eventId, driverId), referencing event, driver and constructor.
///
/// Index names are prefixed with the table name; SQLite index names are
/// database-wide.
fn result_table<R: Record>(conn: &Rc<Connection>, name: &str) -> Result<Table<R>> {
    Table::<R>::new(conn.clone(), name, &["eventId", "driverId"])?
        .with_foreign_keys(vec![
            ForeignKey::between::<R, RaceEvent>("eventId", "events", "id_")?,
            ForeignKey::between::<R, Driver>("driverId", "drivers", "id_")?,
            ForeignKey::between::<R, Constructor>("constructorId", "constructors", "id_")?,
        ])?
        .with_indexes(vec![
            Index::of::<R>(format!("{}_eventIndex", name), name, &["eventId"])?,
            Index::of::<R>(format!("{}_driverIndex", name), name, &["driverId"])?,
            Index::of::<R>(format!("{}_constructorIndex", name), name, &["constructorId"])?,
        ])
}

fn result_router(conn: &Rc<Connection>) -> Result<Router<Results>> {
    let race = ResultTable::Race;
    let qualifying = ResultTable::Qualifying;
    let practice = ResultTable::Practice;

    Ok(Router::new()
        .with_member(race, result_table::<RaceResult>(conn, race.table_name())?)
        .with_member(qualifying, result_table::<QualifyingResult>(conn, qualifying.table_name())?)
        .with_member(practice, result_table::<PracticeResult>(conn, practice.table_name())?))
}

fn standings_router(conn: &Rc<Connection>) -> Result<Router<Standings>> {
    let key = ["year", "position"];
    let drivers =
        Table::<DriverStanding>::new(conn.clone(), StandingsKind::Driver.table_name(), &key)?
            .with_foreign_keys(vec![ForeignKey::between::<DriverStanding, Driver>(
                "driverId", "drivers", "id_",
            )?])?;
    let constructors = Table::<ConstructorStanding>::new(
        conn.clone(),
        StandingsKind::Constructor.table_name(),
        &key,
    )?
    .with_foreign_keys(vec![ForeignKey::between::<ConstructorStanding, Constructor>(
        "constructorId",
        "constructors",
        "id_",
    )?])?;

    Ok(Router::new()
        .with_member(StandingsKind::Driver, drivers)
        .with_member(StandingsKind::Constructor, constructors))
}

/// Row counts per physical table
#[derive(Debug, Clone, Default)]
pub struct StoreStats {
    pub tables: Vec<(String, usize)>,
}

impl StoreStats {
    pub fn total(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }

    pub fn rows(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(name, _)| name == table).map(|(_, rows)| *rows)
    }
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, rows) in &self.tables {
            writeln!(f, "  {}: {}", table, rows)?;
        }
        write!(f, "  Total: {}", self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultCore, ResultRecord, StandingsRecord};
    use crate::record::Predicate;
    use crate::storage::Upsert;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.initialize().unwrap();
        store
    }

    fn driver(id: &str, constructor_id: &str) -> Driver {
        Driver {
            name: id.replace('_', " "),
            short_name: id[..3].to_uppercase(),
            nationality: None,
            constructor_id: Some(constructor_id.to_string()),
            id: id.to_string(),
        }
    }

    /// Circuit, race, constructor and drivers for 2023 round 4 with race,
    /// qualifying and practice sessions
    fn seed(store: &Store) {
        store
            .circuits()
            .insert(&Circuit {
                name: "Baku City Circuit".into(),
                number_of_laps: 51,
                length: 6.003,
                race_distance: 306.049,
                lap_record: None,
                first_grand_prix: Some(2016),
                id: "baku".into(),
            })
            .unwrap();
        store
            .races()
            .insert(&Race::new(2023, 4, "Azerbaijan Grand Prix", "baku"))
            .unwrap();
        for title in ["Race", "Qualifying", "Practice 1", "Practice 2"] {
            store.events().insert(&RaceEvent::new("2023_4", title)).unwrap();
        }
        store
            .constructors()
            .insert_many(&[
                Constructor::new("Red Bull Racing", "red_bull"),
                Constructor::new("Ferrari", "ferrari"),
            ])
            .unwrap();
        store
            .drivers()
            .insert_many(&[driver("sergio_perez", "red_bull"), driver("charles_leclerc", "ferrari")])
            .unwrap();
    }

    fn race_result(driver_id: &str, position: i64, points: f64) -> ResultRecord {
        ResultRecord::Race(RaceResult {
            core: ResultCore::new("2023_4_RACE", position, driver_id),
            points,
            time: None,
        })
    }

    fn qualifying_result(driver_id: &str, position: i64) -> ResultRecord {
        ResultRecord::Qualifying(QualifyingResult {
            core: ResultCore::new("2023_4_QUALIFYING", position, driver_id),
            q1: None,
            q2: None,
            q3: None,
        })
    }

    fn practice_result(session: u8, driver_id: &str, position: i64) -> ResultRecord {
        ResultRecord::Practice(PracticeResult {
            core: ResultCore::new(format!("2023_4_PRACTICE_{}", session), position, driver_id),
            time: None,
            gap: None,
        })
    }

    /// Two race rows, one qualifying row, three practice rows, shuffled
    fn six_results() -> Vec<ResultRecord> {
        vec![
            practice_result(1, "sergio_perez", 2),
            race_result("sergio_perez", 1, 25.0),
            qualifying_result("charles_leclerc", 1),
            practice_result(2, "sergio_perez", 1),
            race_result("charles_leclerc", 3, 15.0),
            practice_result(1, "charles_leclerc", 1),
        ]
    }

    #[test]
    fn test_creation_order_respects_foreign_keys() {
        let store = Store::open_in_memory().unwrap();
        let order: Vec<String> = store
            .tables()
            .unwrap()
            .iter()
            .map(|e| e.table_name().to_string())
            .collect();
        assert_eq!(order.len(), 10);

        let at = |t: &str| order.iter().position(|o| o == t).unwrap();
        assert!(at("circuits") < at("races"));
        assert!(at("races") < at("events"));
        assert!(at("constructors") < at("drivers"));
        for child in ["raceResults", "qualifyingResults", "practiceResults"] {
            assert!(at("events") < at(child));
            assert!(at("drivers") < at(child));
        }
        assert!(at("drivers") < at("driverStandings"));
        assert!(at("constructors") < at("constructorStandings"));
    }

    #[test]
    fn test_initialize_creates_tables_and_indexes() {
        let store = store();
        let tables = store
            .raw("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        assert_eq!(tables.len(), 10);

        let indexes = store
            .raw("SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE '%Index'")
            .unwrap();
        // circuitIndex, raceIndex, three per results table
        assert_eq!(indexes.len(), 11);
    }

    #[test]
    fn test_lifecycle_is_idempotent() {
        let store = store();
        store.initialize().unwrap();
        seed(&store);

        store.reset_tables().unwrap();
        assert_eq!(store.stats().unwrap().total(), 0);

        store.drop_tables().unwrap();
        store.drop_tables().unwrap();
        assert!(store.raw("SELECT name FROM sqlite_master WHERE type = 'table'").unwrap().is_empty());

        store.create_tables().unwrap();
        assert_eq!(store.stats().unwrap().tables.len(), 10);
    }

    #[test]
    fn test_results_route_by_event_type() {
        let store = store();
        seed(&store);
        assert_eq!(store.results().insert_many(&six_results()).unwrap(), 6);

        let stats = store.stats().unwrap();
        assert_eq!(stats.rows("raceResults"), Some(2));
        assert_eq!(stats.rows("qualifyingResults"), Some(1));
        assert_eq!(stats.rows("practiceResults"), Some(3));

        // concatenated in member order: race, qualifying, practice
        let tables: Vec<ResultTable> =
            store.results().get_all().unwrap().iter().map(|r| r.table()).collect();
        assert_eq!(
            tables,
            vec![
                ResultTable::Race,
                ResultTable::Race,
                ResultTable::Qualifying,
                ResultTable::Practice,
                ResultTable::Practice,
                ResultTable::Practice,
            ]
        );

        let practice = store.results().get_by_event_id("2023_4_PRACTICE_1").unwrap();
        assert_eq!(practice.len(), 2);
        assert!(practice.iter().all(|r| r.table() == ResultTable::Practice));
    }

    #[test]
    fn test_results_exists_checks_every_table() {
        let store = store();
        seed(&store);
        store.results().insert(&practice_result(1, "charles_leclerc", 1)).unwrap();

        let by_driver = Predicate::new().eq("driverId", "charles_leclerc".to_string());
        assert!(store.results().exists(&by_driver).unwrap());

        let by_other = Predicate::new().eq("driverId", "sergio_perez".to_string());
        assert!(!store.results().exists(&by_other).unwrap());

        let routed = Predicate::new()
            .eq("eventId", "2023_4_RACE".to_string())
            .eq("driverId", "charles_leclerc".to_string());
        assert!(!store.results().exists(&routed).unwrap());
    }

    #[test]
    fn test_results_upsert_updates_in_own_table() {
        let store = store();
        seed(&store);

        let first = store.results().insert_or_update(&race_result("sergio_perez", 1, 25.0)).unwrap();
        assert_eq!(first, Upsert::Inserted);

        let again = store.results().insert_or_update(&race_result("sergio_perez", 1, 26.0)).unwrap();
        assert_eq!(again, Upsert::Updated);

        let key = Predicate::new()
            .eq("eventId", "2023_4_RACE".to_string())
            .eq("driverId", "sergio_perez".to_string());
        match store.results().get_by_keys(&key).unwrap() {
            ResultRecord::Race(r) => assert_eq!(r.points, 26.0),
            other => panic!("expected race result, got {:?}", other),
        }
        assert_eq!(store.stats().unwrap().rows("raceResults"), Some(1));
    }

    #[test]
    fn test_results_delete_fans_out() {
        let store = store();
        seed(&store);
        store.results().insert_many(&six_results()).unwrap();

        let by_driver = Predicate::new().eq("driverId", "sergio_perez".to_string());
        assert_eq!(store.results().delete(&by_driver).unwrap(), 3);
        assert_eq!(store.results().get_all().unwrap().len(), 3);
    }

    #[test]
    fn test_standings_route_by_subject() {
        let store = store();
        seed(&store);

        let rows = vec![
            StandingsRecord::Driver(DriverStanding {
                year: 2023,
                position: 1,
                points: 69.0,
                driver_id: "sergio_perez".into(),
                constructor_id: Some("red_bull".into()),
                nationality: None,
            }),
            StandingsRecord::Constructor(ConstructorStanding {
                year: 2023,
                position: 1,
                points: 122.0,
                constructor_id: "red_bull".into(),
            }),
        ];
        let summary = store.standings().insert_or_update_many(&rows).unwrap();
        assert_eq!(summary.inserted, 2);

        // same (year, position) key exists in both tables; each upsert stays in its own
        let summary = store.standings().insert_or_update_many(&rows).unwrap();
        assert_eq!(summary.updated, 2);
        assert_eq!(store.standings().get_all().unwrap().len(), 2);

        let by_driver = Predicate::new().eq("driverId", "sergio_perez".to_string());
        let found = store.standings().get_by_keys(&by_driver).unwrap();
        assert_eq!(found.kind(), StandingsKind::Driver);
    }

    #[test]
    fn test_router_rejects_bad_input() {
        let store = store();
        seed(&store);

        let bogus = Predicate::new().eq("lapTime", "1:43.370".to_string());
        assert!(matches!(store.results().exists(&bogus), Err(Error::Schema(_))));

        let misplaced = ResultRecord::Qualifying(QualifyingResult {
            core: ResultCore::new("2023_4_RACE", 1, "sergio_perez"),
            q1: None,
            q2: None,
            q3: None,
        });
        assert!(matches!(store.results().insert(&misplaced), Err(Error::Routing(_))));

        let missing = Predicate::new()
            .eq("eventId", "2023_4_RACE".to_string())
            .eq("driverId", "sergio_perez".to_string());
        assert!(matches!(store.results().get_by_keys(&missing), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let store = store();
        let orphan = Race::new(2023, 5, "Miami Grand Prix", "miami");
        let err = store.races().insert(&orphan).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn test_rollback_discards_pending_writes() {
        let store = store();
        store.commit().unwrap();
        store.constructors().insert(&Constructor::new("Ferrari", "ferrari")).unwrap();
        store.rollback().unwrap();
        assert_eq!(store.constructors().count().unwrap(), 0);
    }

    #[test]
    fn test_transaction_reopens_after_sqlite_ends_it() {
        let store = store();
        store.conn.execute_batch("COMMIT").unwrap();
        store.rollback().unwrap();
        assert!(!store.conn.is_autocommit());

        store.constructors().insert(&Constructor::new("Ferrari", "ferrari")).unwrap();
        store.commit().unwrap();
        store.conn.execute_batch("COMMIT").unwrap();
        store.commit().unwrap();
        assert!(!store.conn.is_autocommit());
        assert_eq!(store.constructors().count().unwrap(), 1);
    }

    #[test]
    fn test_circuit_reads_back_unchanged() {
        let store = store();
        let monza = Circuit {
            name: "Autodromo Nazionale Monza".into(),
            number_of_laps: 53,
            length: 5.793,
            race_distance: 306.72,
            lap_record: Some("1:21.046".into()),
            first_grand_prix: None,
            id: "monza".into(),
        };
        store.circuits().insert(&monza).unwrap();

        let found = store
            .circuits()
            .get_by_keys(&Predicate::new().eq("id_", "monza".to_string()))
            .unwrap();
        assert_eq!(found, monza);
    }

    #[test]
    fn test_commit_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paddock.db");

        let store = Store::open(&path).unwrap();
        store.initialize().unwrap();
        store.constructors().insert(&Constructor::new("Ferrari", "ferrari")).unwrap();
        store.commit().unwrap();
        store.constructors().insert(&Constructor::new("McLaren", "mclaren")).unwrap();
        store.close().unwrap();

        let reopened = Store::open(&path).unwrap();
        let ids: Vec<String> =
            reopened.constructors().get_all().unwrap().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["ferrari"]);
    }

    #[test]
    fn test_stats_display() {
        let store = store();
        seed(&store);
        let text = store.stats().unwrap().to_string();
        assert!(text.contains("constructors: 2"));
        assert!(text.ends_with("Total: 10"));
    }
}
