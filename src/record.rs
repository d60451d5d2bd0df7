//! Record descriptors - the field schema every persisted type carries
//!
//! Each record type declares a fixed, ordered list of `(name, type)` pairs.
//! That order is the column order of every generated statement:
//! - `CREATE TABLE` columns
//! - `INSERT` / `UPDATE` bindings
//! - `SELECT` projections decoded by `Record::from_row`

use crate::{Error, Result};
use rusqlite::types::Value;
use std::fmt;

/// Semantic type of a field, mapped onto a SQLite column affinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Integer,
    Real,
}

impl FieldType {
    /// Column type used in generated DDL
    pub fn sql_type(&self) -> &'static str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Integer => "INTEGER",
            FieldType::Real => "REAL",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql_type())
    }
}

/// One named, typed field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub const fn text(name: &'static str) -> Self {
        Self { name, ty: FieldType::Text }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, ty: FieldType::Integer }
    }

    pub const fn real(name: &'static str) -> Self {
        Self { name, ty: FieldType::Real }
    }

    /// Column definition fragment, e.g. `numberOfLaps INTEGER`
    pub fn column_definition(&self) -> String {
        format!("{} {}", self.name, self.ty.sql_type())
    }
}

/// Record Type Descriptor: the record's name plus its ordered fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordSchema {
    /// Type name, also the default table name
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl RecordSchema {
    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Index of a column in declared field order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == column)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Fail with a schema error unless every column is a declared field
    pub fn require_columns<'a, I>(&self, columns: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for column in columns {
            if !self.contains(column) {
                return Err(Error::Schema(format!(
                    "Column {} not found in {}",
                    column, self.name
                )));
            }
        }
        Ok(())
    }
}

/// A type that can be persisted by a `Table`.
///
/// `values` must yield exactly one value per field of `SCHEMA`, in the same
/// order, and `from_row` must read them back by the same positions.
pub trait Record: Sized {
    const SCHEMA: RecordSchema;

    fn values(&self) -> Vec<Value>;

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// Value of a single declared field
    fn value_of(&self, column: &str) -> Option<Value> {
        let position = Self::SCHEMA.position(column)?;
        self.values().into_iter().nth(position)
    }
}

/// Equality conjunction over named columns, kept in insertion order.
///
/// An empty predicate matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` term (replaces an earlier term on the same column)
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.terms.iter_mut().find(|(c, _)| *c == column) {
            Some(term) => term.1 = value,
            None => self.terms.push((column, value)),
        }
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.terms.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    /// Text value of a term, if present and textual
    pub fn get_text(&self, column: &str) -> Option<&str> {
        match self.get(column) {
            Some(Value::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.terms.iter().map(|(_, v)| v)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// ` WHERE a = ? AND b = ?`, or nothing for an empty predicate
    pub(crate) fn where_clause(&self) -> String {
        if self.terms.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = self.columns().map(|c| format!("{} = ?", c)).collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|(c, v)| format!("{}={:?}", c, v))
            .collect();
        write!(f, "{{{}}}", terms.join(", "))
    }
}
