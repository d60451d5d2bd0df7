//! Domain records
//!
//! Every record declares its field schema through `Record::SCHEMA`; column
//! names follow the stored layout (`id_`, `round_`, `type_`, camelCase).
//! Collector mappings use the same keys.

pub mod circuit;
pub mod constructor;
pub mod driver;
pub mod race;
pub mod event;
pub mod result;
pub mod standings;

pub use circuit::Circuit;
pub use constructor::Constructor;
pub use driver::Driver;
pub use race::Race;
pub use event::RaceEvent;
pub use result::{
    PracticeResult, QualifyingResult, RaceResult, ResultCore, ResultRecord, ResultTable, Results,
};
pub use standings::{ConstructorStanding, DriverStanding, Standings, StandingsKind, StandingsRecord};

use crate::{Error, Result};

/// Maps a display name (circuit, constructor...) onto its canonical id.
///
/// Reconciliation against reference data happens behind this interface.
pub trait IdResolver {
    fn resolve_id(&self, name: &str) -> Option<String>;
}

impl<F> IdResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn resolve_id(&self, name: &str) -> Option<String> {
        self(name)
    }
}

pub(crate) fn resolve(resolver: &dyn IdResolver, kind: &str, name: &str) -> Result<String> {
    resolver
        .resolve_id(name)
        .ok_or_else(|| Error::NotFound(format!("{} not found: {}", kind, name)))
}
