//! Storage Layer - SQLite-backed persistence
//!
//! - `schema`: primary key, foreign key and index descriptors
//! - `table`: the generic record mapper `Table<R>`
//! - `deps`: foreign-key dependency ordering
//! - `router`: one logical family over several physical tables
//! - `sqlite`: the `Store` facade that wires every table together

pub mod deps;
pub mod router;
pub mod schema;
pub mod sqlite;
pub mod table;

pub use deps::DependencyGraph;
pub use router::{Family, Member, Router, Variant};
pub use schema::{FkAction, ForeignKey, Index, PrimaryKey};
pub use sqlite::{Store, StoreStats};
pub use table::{Table, TableEntry, Upsert, UpsertSummary};
