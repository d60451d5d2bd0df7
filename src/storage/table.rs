//! Generic table mapper
//!
//! `Table<R>` renders DDL from `R::SCHEMA` plus its constraints and performs
//! CRUD + upsert against one physical SQLite table. All mappers of a `Store`
//! share a single connection.

use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use rusqlite::{Connection, OptionalExtension, params_from_iter};

use super::schema::{ForeignKey, Index, PrimaryKey};
use crate::record::{Field, Predicate, Record};
use crate::{Error, Result};

/// DDL lifecycle shared by every physical table.
///
/// This is the unit the dependency resolver orders.
pub trait TableEntry {
    fn table_name(&self) -> &str;

    fn foreign_keys(&self) -> &[ForeignKey];

    /// `CREATE TABLE IF NOT EXISTS`
    fn create_table(&self) -> Result<()>;

    /// `DROP TABLE IF EXISTS`
    fn drop_table(&self) -> Result<()>;

    fn create_indexes(&self) -> Result<()>;

    fn count(&self) -> Result<usize>;

    fn initialize(&self) -> Result<()> {
        self.create_table()?;
        self.create_indexes()
    }

    fn reset(&self) -> Result<()> {
        self.drop_table()?;
        self.initialize()
    }
}

/// What `insert_or_update` did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Upsert {
    Inserted,
    Updated,
}

impl Upsert {
    /// 0 for inserted, 1 for updated
    pub fn code(&self) -> i32 {
        match self {
            Upsert::Inserted => 0,
            Upsert::Updated => 1,
        }
    }
}

impl fmt::Display for Upsert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upsert::Inserted => write!(f, "inserted"),
            Upsert::Updated => write!(f, "updated"),
        }
    }
}

/// Counts of a batched upsert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
}

impl UpsertSummary {
    pub fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Inserted => self.inserted += 1,
            Upsert::Updated => self.updated += 1,
        }
    }

    pub fn merge(&mut self, other: UpsertSummary) {
        self.inserted += other.inserted;
        self.updated += other.updated;
    }

    pub fn total(&self) -> usize {
        self.inserted + self.updated
    }
}

impl fmt::Display for UpsertSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} inserted, {} updated", self.inserted, self.updated)
    }
}

/// Record mapper for one physical table
pub struct Table<R: Record> {
    conn: Rc<Connection>,
    name: String,
    primary_key: PrimaryKey,
    foreign_keys: Vec<ForeignKey>,
    indexes: Vec<Index>,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Table<R> {
    /// Mapper for table `name`, keyed by `key_columns` of `R`
    pub fn new(
        conn: Rc<Connection>,
        name: impl Into<String>,
        key_columns: &[&str],
    ) -> Result<Self> {
        Ok(Self {
            conn,
            name: name.into(),
            primary_key: PrimaryKey::of::<R>(key_columns)?,
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            _record: PhantomData,
        })
    }

    /// Attach foreign keys; each local column must be a field of `R`
    pub fn with_foreign_keys(mut self, foreign_keys: Vec<ForeignKey>) -> Result<Self> {
        for fk in &foreign_keys {
            R::SCHEMA.require_columns([fk.column])?;
        }
        self.foreign_keys = foreign_keys;
        Ok(self)
    }

    /// Attach indexes; each must target this table over fields of `R`
    pub fn with_indexes(mut self, indexes: Vec<Index>) -> Result<Self> {
        for index in &indexes {
            if index.table != self.name {
                return Err(Error::Schema(format!(
                    "Index {} targets {}, not {}",
                    index.name, index.table, self.name
                )));
            }
            R::SCHEMA.require_columns(index.columns.iter().copied())?;
        }
        self.indexes = indexes;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        &self.primary_key
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    // ========== Statements ==========

    pub fn create_table_statement(&self) -> String {
        let mut fragments: Vec<String> =
            R::SCHEMA.fields.iter().map(Field::column_definition).collect();
        fragments.push(self.primary_key.to_string());
        fragments.extend(self.foreign_keys.iter().map(ToString::to_string));

        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, fragments.join(", "))
    }

    fn column_list(&self) -> String {
        R::SCHEMA.column_names().join(", ")
    }

    fn insert_statement(&self) -> String {
        let placeholders = vec!["?"; R::SCHEMA.fields.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.name,
            self.column_list(),
            placeholders
        )
    }

    fn select_statement(&self, predicate: &Predicate) -> String {
        format!(
            "SELECT {} FROM {}{}",
            self.column_list(),
            self.name,
            predicate.where_clause()
        )
    }

    /// Predicate columns are spliced into SQL, so only declared fields pass
    fn check_predicate(&self, predicate: &Predicate) -> Result<()> {
        R::SCHEMA.require_columns(predicate.columns())
    }

    /// Primary-key equality predicate for a record
    pub fn key_of(&self, record: &R) -> Predicate {
        self.primary_key.predicate_for(record)
    }

    // ========== Writes ==========

    /// Insert one record; constraint violations surface as `Error::Integrity`
    pub fn insert(&self, record: &R) -> Result<()> {
        let sql = self.insert_statement();
        tracing::debug!("{}: {}", self.name, sql);
        self.conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(record.values()))?;
        Ok(())
    }

    /// Insert records one statement at a time; earlier rows stay applied on failure
    pub fn insert_many<'a, I>(&self, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let sql = self.insert_statement();
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let mut inserted = 0;
        for record in records {
            stmt.execute(params_from_iter(record.values()))?;
            inserted += 1;
        }
        tracing::debug!("{}: inserted {} rows", self.name, inserted);
        Ok(inserted)
    }

    /// Overwrite every field of the row matching the record's primary key.
    ///
    /// Returns the number of rows changed; 0 when no row matches.
    pub fn update(&self, record: &R) -> Result<usize> {
        let values = record.values();
        let key = self.primary_key.predicate_from(&values);
        let assignments: Vec<String> = R::SCHEMA
            .fields
            .iter()
            .map(|f| format!("{} = ?", f.name))
            .collect();
        let sql = format!(
            "UPDATE {} SET {}{}",
            self.name,
            assignments.join(", "),
            key.where_clause()
        );
        tracing::debug!("{}: {}", self.name, sql);

        let bindings = values.into_iter().chain(key.values().cloned());
        let changed = self.conn.prepare_cached(&sql)?.execute(params_from_iter(bindings))?;
        if changed == 0 {
            tracing::debug!("{}: update matched no row for {}", self.name, key);
        }
        Ok(changed)
    }

    /// Delete every row matching the predicate, returning how many were removed
    pub fn delete(&self, predicate: &Predicate) -> Result<usize> {
        self.check_predicate(predicate)?;
        let sql = format!("DELETE FROM {}{}", self.name, predicate.where_clause());
        tracing::debug!("{}: {}", self.name, sql);
        let removed = self
            .conn
            .prepare_cached(&sql)?
            .execute(params_from_iter(predicate.values()))?;
        Ok(removed)
    }

    /// Update if a row with the same primary key exists, insert otherwise.
    ///
    /// Two statements, not one: a concurrent writer may slip in between the
    /// existence check and the write.
    pub fn insert_or_update(&self, record: &R) -> Result<Upsert> {
        let key = self.key_of(record);
        if self.exists(&key)? {
            self.update(record)?;
            Ok(Upsert::Updated)
        } else {
            self.insert(record)?;
            Ok(Upsert::Inserted)
        }
    }

    /// `insert_or_update` per record in input order; stops at the first failure
    pub fn insert_or_update_many<'a, I>(&self, records: I) -> Result<UpsertSummary>
    where
        I: IntoIterator<Item = &'a R>,
        R: 'a,
    {
        let mut summary = UpsertSummary::default();
        for record in records {
            summary.record(self.insert_or_update(record)?);
        }
        tracing::debug!("{}: {}", self.name, summary);
        Ok(summary)
    }

    // ========== Reads ==========

    pub fn get_all(&self) -> Result<Vec<R>> {
        self.get_by_keys_many(&Predicate::new())
    }

    /// First row matching the predicate, `Error::NotFound` when none does
    pub fn get_by_keys(&self, predicate: &Predicate) -> Result<R> {
        self.check_predicate(predicate)?;
        let sql = self.select_statement(predicate);
        let found = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params_from_iter(predicate.values()), |row| R::from_row(row))
            .optional()?;

        found.ok_or_else(|| Error::NotFound(format!("{} matching {}", self.name, predicate)))
    }

    /// Every row matching the predicate; empty when none does
    pub fn get_by_keys_many(&self, predicate: &Predicate) -> Result<Vec<R>> {
        self.check_predicate(predicate)?;
        let sql = self.select_statement(predicate);
        let mut stmt = self.conn.prepare_cached(&sql)?;
        let records = stmt
            .query_map(params_from_iter(predicate.values()), |row| R::from_row(row))?
            .collect::<rusqlite::Result<Vec<R>>>()?;
        Ok(records)
    }

    /// Whether any row matches the predicate (any columns, not only the key)
    pub fn exists(&self, predicate: &Predicate) -> Result<bool> {
        self.check_predicate(predicate)?;
        let sql = format!("SELECT COUNT(*) FROM {}{}", self.name, predicate.where_clause());
        let count: i64 = self
            .conn
            .prepare_cached(&sql)?
            .query_row(params_from_iter(predicate.values()), |row| row.get(0))?;
        Ok(count > 0)
    }
}

impl<R: Record> TableEntry for Table<R> {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    fn create_table(&self) -> Result<()> {
        let sql = self.create_table_statement();
        tracing::debug!("{}: {}", self.name, sql);
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    fn drop_table(&self) -> Result<()> {
        tracing::debug!("{}: drop", self.name);
        self.conn.execute(&format!("DROP TABLE IF EXISTS {}", self.name), [])?;
        Ok(())
    }

    fn create_indexes(&self) -> Result<()> {
        for index in &self.indexes {
            self.conn.execute(&index.statement(), [])?;
        }
        Ok(())
    }

    fn count(&self) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSchema;
    use rusqlite::types::Value;

    #[derive(Debug, Clone, PartialEq)]
    struct Team {
        name: String,
        id: String,
    }

    impl Record for Team {
        const SCHEMA: RecordSchema = RecordSchema {
            name: "Team",
            fields: &[Field::text("name"), Field::text("id_")],
        };

        fn values(&self) -> Vec<Value> {
            vec![self.name.clone().into(), self.id.clone().into()]
        }

        fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { name: row.get(0)?, id: row.get(1)? })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        season: i64,
        position: i64,
        team_id: String,
        points: f64,
    }

    impl Record for Entry {
        const SCHEMA: RecordSchema = RecordSchema {
            name: "Entry",
            fields: &[
                Field::integer("season"),
                Field::integer("position"),
                Field::text("teamId"),
                Field::real("points"),
            ],
        };

        fn values(&self) -> Vec<Value> {
            vec![
                self.season.into(),
                self.position.into(),
                self.team_id.clone().into(),
                self.points.into(),
            ]
        }

        fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                season: row.get(0)?,
                position: row.get(1)?,
                team_id: row.get(2)?,
                points: row.get(3)?,
            })
        }
    }

    fn connection() -> Rc<Connection> {
        let conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "foreign_keys", true).unwrap();
        Rc::new(conn)
    }

    fn team(id: &str, name: &str) -> Team {
        Team { name: name.to_string(), id: id.to_string() }
    }

    fn entry(season: i64, position: i64, team_id: &str, points: f64) -> Entry {
        Entry { season, position, team_id: team_id.to_string(), points }
    }

    fn tables(conn: &Rc<Connection>) -> (Table<Team>, Table<Entry>) {
        let teams = Table::<Team>::new(conn.clone(), "teams", &["id_"]).unwrap();
        let entries = Table::<Entry>::new(conn.clone(), "entries", &["season", "position"])
            .unwrap()
            .with_foreign_keys(vec![
                ForeignKey::between::<Entry, Team>("teamId", "teams", "id_").unwrap(),
            ])
            .unwrap()
            .with_indexes(vec![Index::of::<Entry>("entries_team", "entries", &["teamId"]).unwrap()])
            .unwrap();

        teams.initialize().unwrap();
        entries.initialize().unwrap();
        (teams, entries)
    }

    #[test]
    fn test_create_table_statement() {
        let conn = connection();
        let (_, entries) = tables(&conn);
        assert_eq!(
            entries.create_table_statement(),
            "CREATE TABLE IF NOT EXISTS entries (season INTEGER, position INTEGER, teamId TEXT, \
             points REAL, PRIMARY KEY (season, position), FOREIGN KEY (teamId) REFERENCES teams(id_))"
        );
    }

    #[test]
    fn test_key_columns_must_belong_to_record() {
        let err = Table::<Entry>::new(connection(), "entries", &["id_"]).err().unwrap();
        assert!(matches!(err, Error::Schema(ref m) if m.contains("id_")));
        assert!(Table::<Team>::new(connection(), "teams", &[]).is_err());
    }

    #[test]
    fn test_constraints_must_belong_to_table() {
        let conn = connection();
        let entries = || Table::<Entry>::new(conn.clone(), "entries", &["season"]).unwrap();

        let team_fk = ForeignKey::between::<Team, Team>("id_", "teams", "id_").unwrap();
        assert!(matches!(entries().with_foreign_keys(vec![team_fk]), Err(Error::Schema(_))));

        let elsewhere = Index::of::<Entry>("teams_team", "teams", &["teamId"]).unwrap();
        assert!(matches!(entries().with_indexes(vec![elsewhere]), Err(Error::Schema(_))));

        let foreign_columns = Index::of::<Team>("entries_name", "entries", &["name"]).unwrap();
        assert!(matches!(entries().with_indexes(vec![foreign_columns]), Err(Error::Schema(_))));
    }

    #[test]
    fn test_key_resolves_against_own_schema() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        let ferrari = team("ferrari", "Scuderia Ferrari");

        let key = teams.key_of(&ferrari);
        assert_eq!(key.get_text("id_"), Some("ferrari"));
        assert_eq!(teams.insert_or_update(&ferrari).unwrap(), Upsert::Inserted);
        assert_eq!(teams.insert_or_update(&ferrari).unwrap(), Upsert::Updated);
    }

    #[test]
    fn test_ddl_is_idempotent() {
        let conn = connection();
        let (teams, entries) = tables(&conn);
        teams.initialize().unwrap();
        entries.initialize().unwrap();

        entries.drop_table().unwrap();
        entries.drop_table().unwrap();
        entries.reset().unwrap();
        assert_eq!(entries.count().unwrap(), 0);
    }

    #[test]
    fn test_insert_and_read_back() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        let red_bull = team("red_bull", "Red Bull Racing");
        teams.insert(&red_bull).unwrap();

        let found = teams
            .get_by_keys(&Predicate::new().eq("id_", "red_bull".to_string()))
            .unwrap();
        assert_eq!(found, red_bull);
        assert_eq!(teams.get_all().unwrap(), vec![red_bull]);
    }

    #[test]
    fn test_duplicate_primary_key_is_integrity_error() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        teams.insert(&team("ferrari", "Ferrari")).unwrap();
        let err = teams.insert(&team("ferrari", "Scuderia Ferrari")).unwrap_err();
        assert!(err.is_integrity(), "unexpected error: {err}");
    }

    #[test]
    fn test_foreign_key_violation_is_integrity_error() {
        let conn = connection();
        let (_, entries) = tables(&conn);
        let err = entries.insert(&entry(2023, 1, "nobody", 10.0)).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
    }

    #[test]
    fn test_insert_many_is_not_atomic() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        let batch = vec![
            team("mclaren", "McLaren"),
            team("alpine", "Alpine"),
            team("mclaren", "McLaren F1"),
            team("haas", "Haas"),
        ];
        assert!(teams.insert_many(&batch).is_err());
        assert_eq!(teams.count().unwrap(), 2);
    }

    #[test]
    fn test_update_missing_row_is_noop() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        assert_eq!(teams.update(&team("williams", "Williams")).unwrap(), 0);
        assert_eq!(teams.count().unwrap(), 0);
    }

    #[test]
    fn test_get_by_keys_not_found_vs_many_empty() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        let predicate = Predicate::new().eq("name", "Brawn GP".to_string());

        assert!(matches!(teams.get_by_keys(&predicate), Err(Error::NotFound(_))));
        assert!(teams.get_by_keys_many(&predicate).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_predicate_column_is_schema_error() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        let predicate = Predicate::new().eq("name; DROP TABLE teams", 1i64);
        assert!(matches!(teams.exists(&predicate), Err(Error::Schema(_))));
    }

    #[test]
    fn test_exists_by_non_key_columns() {
        let conn = connection();
        let (teams, entries) = tables(&conn);
        teams.insert(&team("ferrari", "Ferrari")).unwrap();
        entries.insert(&entry(2023, 3, "ferrari", 406.0)).unwrap();

        assert!(entries.exists(&Predicate::new().eq("teamId", "ferrari".to_string())).unwrap());
        assert!(!entries.exists(&Predicate::new().eq("points", 1.0)).unwrap());
        assert!(entries.exists(&Predicate::new()).unwrap());
    }

    #[test]
    fn test_insert_or_update_twice() {
        let conn = connection();
        let (teams, entries) = tables(&conn);
        teams.insert(&team("mercedes", "Mercedes")).unwrap();

        let first = entry(2023, 2, "mercedes", 400.0);
        assert_eq!(entries.insert_or_update(&first).unwrap(), Upsert::Inserted);
        assert_eq!(entries.insert_or_update(&first).unwrap(), Upsert::Updated);
        assert_eq!(Upsert::Updated.code(), 1);

        let revised = entry(2023, 2, "mercedes", 409.0);
        entries.insert_or_update(&revised).unwrap();
        assert_eq!(entries.count().unwrap(), 1);
        assert_eq!(entries.get_all().unwrap(), vec![revised]);
    }

    #[test]
    fn test_insert_or_update_many_summary() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        teams.insert(&team("alpine", "Alpine")).unwrap();

        let summary = teams
            .insert_or_update_many(&[team("alpine", "BWT Alpine"), team("haas", "Haas")])
            .unwrap();
        assert_eq!(summary, UpsertSummary { inserted: 1, updated: 1 });
        assert_eq!(summary.total(), 2);
    }

    #[test]
    fn test_delete_by_predicate() {
        let conn = connection();
        let (teams, _) = tables(&conn);
        teams.insert_many(&[team("a", "A"), team("b", "B")]).unwrap();

        let removed = teams.delete(&Predicate::new().eq("id_", "a".to_string())).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(teams.count().unwrap(), 1);
    }
}
