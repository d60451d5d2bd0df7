//! Constraint descriptors validated against record schemas
//!
//! - `PrimaryKey` renders `PRIMARY KEY (...)`
//! - `ForeignKey` renders `FOREIGN KEY (...) REFERENCES t(...) [ON DELETE ..] [ON UPDATE ..]`
//! - `Index` renders `CREATE INDEX IF NOT EXISTS ...`
//!
//! Construction fails with `Error::Schema` when a column is not a declared
//! field of the owning (or referenced) record.

use crate::record::{Predicate, Record, RecordSchema};
use crate::{Error, Result};
use rusqlite::types::Value;
use std::fmt;

/// Ordered, non-empty primary key columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryKey {
    columns: Vec<&'static str>,
    positions: Vec<usize>,
}

impl PrimaryKey {
    pub fn new(schema: &RecordSchema, columns: &[&str]) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Schema(format!(
                "Primary key of {} must name at least one column",
                schema.name
            )));
        }
        schema.require_columns(columns.iter().copied())?;

        // positions are resolved once; `require_columns` guarantees they exist
        let positions: Vec<usize> = columns.iter().filter_map(|c| schema.position(c)).collect();
        let columns = positions.iter().map(|&p| schema.fields[p].name).collect();

        Ok(Self { columns, positions })
    }

    pub fn of<R: Record>(columns: &[&str]) -> Result<Self> {
        Self::new(&R::SCHEMA, columns)
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// Equality predicate over the key columns, taken from a full value row
    pub fn predicate_from(&self, values: &[Value]) -> Predicate {
        self.columns
            .iter()
            .zip(&self.positions)
            .fold(Predicate::new(), |predicate, (column, &position)| {
                let value = values.get(position).cloned().unwrap_or(Value::Null);
                predicate.eq(*column, value)
            })
    }

    pub fn predicate_for<R: Record>(&self, record: &R) -> Predicate {
        self.predicate_from(&record.values())
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PRIMARY KEY ({})", self.columns.join(", "))
    }
}

/// Referential action for `ON DELETE` / `ON UPDATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FkAction {
    NoAction,
    Restrict,
    Cascade,
    SetNull,
    SetDefault,
}

impl FkAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            FkAction::NoAction => "NO ACTION",
            FkAction::Restrict => "RESTRICT",
            FkAction::Cascade => "CASCADE",
            FkAction::SetNull => "SET NULL",
            FkAction::SetDefault => "SET DEFAULT",
        }
    }
}

impl fmt::Display for FkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_sql())
    }
}

/// Single-column foreign key to another table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: &'static str,
    pub ref_table: String,
    pub ref_column: &'static str,
    pub on_delete: Option<FkAction>,
    pub on_update: Option<FkAction>,
}

impl ForeignKey {
    pub fn new(
        schema: &RecordSchema,
        column: &str,
        ref_schema: &RecordSchema,
        ref_table: impl Into<String>,
        ref_column: &str,
    ) -> Result<Self> {
        let column = schema
            .position(column)
            .map(|p| schema.fields[p].name)
            .ok_or_else(|| {
                Error::Schema(format!("Column {} not found in {}", column, schema.name))
            })?;
        let ref_column = ref_schema
            .position(ref_column)
            .map(|p| ref_schema.fields[p].name)
            .ok_or_else(|| {
                Error::Schema(format!("Column {} not found in {}", ref_column, ref_schema.name))
            })?;

        Ok(Self {
            column,
            ref_table: ref_table.into(),
            ref_column,
            on_delete: None,
            on_update: None,
        })
    }

    /// `FOREIGN KEY` from `R.column` to `Ref.ref_column` in table `ref_table`
    pub fn between<R: Record, Ref: Record>(
        column: &str,
        ref_table: impl Into<String>,
        ref_column: &str,
    ) -> Result<Self> {
        Self::new(&R::SCHEMA, column, &Ref::SCHEMA, ref_table, ref_column)
    }

    pub fn on_delete(mut self, action: FkAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: FkAction) -> Self {
        self.on_update = Some(action);
        self
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.column, self.ref_table, self.ref_column
        )?;
        if let Some(action) = self.on_delete {
            write!(f, " ON DELETE {}", action)?;
        }
        if let Some(action) = self.on_update {
            write!(f, " ON UPDATE {}", action)?;
        }
        Ok(())
    }
}

/// Named index over one or more columns of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub table: String,
    pub columns: Vec<&'static str>,
}

impl Index {
    pub fn new(
        schema: &RecordSchema,
        name: impl Into<String>,
        table: impl Into<String>,
        columns: &[&str],
    ) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::Schema(format!(
                "Index on {} must name at least one column",
                schema.name
            )));
        }
        schema.require_columns(columns.iter().copied())?;
        let columns = columns
            .iter()
            .filter_map(|c| schema.position(c))
            .map(|p| schema.fields[p].name)
            .collect();

        Ok(Self {
            name: name.into(),
            table: table.into(),
            columns,
        })
    }

    pub fn of<R: Record>(
        name: impl Into<String>,
        table: impl Into<String>,
        columns: &[&str],
    ) -> Result<Self> {
        Self::new(&R::SCHEMA, name, table, columns)
    }

    pub fn statement(&self) -> String {
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            self.name,
            self.table,
            self.columns.join(", ")
        )
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.statement())
    }
}
