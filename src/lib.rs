//! # Paddock - Formula 1 race data persistence
//!
//! Persists races, events, circuits, drivers, constructors, results and
//! standings into SQLite through one generic mapping engine.
//!
//! Paddock provides:
//! - Field descriptors attached to every record type
//! - Primary key, foreign key and index descriptors validated at construction
//! - A generic table mapper with insert/update/upsert and predicate reads
//! - Foreign-key driven create/drop ordering (topological sort)
//! - Routers that spread one logical entity family over several tables

pub mod record;
pub mod ids;
pub mod models;
pub mod storage;
pub mod import;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use ids::{EventId, EventType, RaceId};
pub use record::{Field, FieldType, Predicate, Record, RecordSchema};
pub use storage::{Store, Table, TableEntry, Upsert};

/// Result type alias for Paddock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Paddock operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Cyclic dependency between tables: {0}")]
    CyclicDependency(String),

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(ref failure, ref message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                let detail = message.clone().unwrap_or_else(|| failure.to_string());
                Error::Integrity(detail)
            }
            other => Error::Storage(other),
        }
    }
}

impl Error {
    /// True for primary-key / foreign-key violations raised by the store
    pub fn is_integrity(&self) -> bool {
        matches!(self, Error::Integrity(_))
    }
}
