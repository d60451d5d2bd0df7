//! Race and event identifiers
//!
//! Format:
//! - race: `<year>_<round>`, e.g. `2023_4`
//! - event: `<raceId>_<TITLE>`, spaces replaced by `_` and upper-cased,
//!   e.g. `2023_4_RACE`, `2023_4_PRACTICE_1`, `2023_4_SPRINT_QUALIFYING`
//!
//! The event title inside an event id is the discriminant that routes results
//! to their physical table.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one race weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RaceId {
    pub year: i32,
    pub round: u32,
}

impl RaceId {
    pub fn new(year: i32, round: u32) -> Self {
        Self { year, round }
    }

    /// Parse `<year>_<round>`
    pub fn parse(id: &str) -> Result<Self> {
        let (year, round) = id
            .split_once('_')
            .ok_or_else(|| Error::InvalidId(format!("race id must be <year>_<round>: {}", id)))?;

        let year: i32 = year
            .parse()
            .map_err(|_| Error::InvalidId(format!("Invalid year in race id: {}", id)))?;
        let round: u32 = round
            .parse()
            .map_err(|_| Error::InvalidId(format!("Invalid round in race id: {}", id)))?;

        Ok(Self { year, round })
    }

    pub fn to_id_string(&self) -> String {
        format!("{}_{}", self.year, self.round)
    }
}

impl fmt::Display for RaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_id_string())
    }
}

impl FromStr for RaceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Identity of one session (race, qualifying, practice...) within a weekend
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventId {
    pub race: RaceId,
    /// Title with words separated by single spaces, e.g. `PRACTICE 1`
    pub title: String,
}

impl EventId {
    pub fn new(race: RaceId, title: impl Into<String>) -> Self {
        Self { race, title: title.into() }
    }

    /// Build the stored id from a raw race id and a display title
    pub fn format(race_id: &str, title: &str) -> String {
        format!("{}_{}", race_id, title).replace(' ', "_").to_uppercase()
    }

    /// Everything after the second `_`, re-joined with spaces
    pub fn title_of(id: &str) -> Result<String> {
        let segments: Vec<&str> = id.split('_').collect();
        if segments.len() < 3 {
            return Err(Error::InvalidId(format!(
                "event id must be <year>_<round>_<title>: {}",
                id
            )));
        }
        Ok(segments[2..].join(" "))
    }

    /// Parse `<year>_<round>_<TITLE>`
    pub fn parse(id: &str) -> Result<Self> {
        let title = Self::title_of(id)?;
        let mut parts = id.splitn(3, '_');
        let year = parts.next().unwrap_or_default();
        let round = parts.next().unwrap_or_default();
        let race = RaceId::parse(&format!("{}_{}", year, round))?;

        Ok(Self { race, title })
    }

    pub fn to_id_string(&self) -> String {
        Self::format(&self.race.to_id_string(), &self.title)
    }

    pub fn event_type(&self) -> EventType {
        EventType::classify(&self.title)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn year(&self) -> i32 {
        self.race.year
    }

    pub fn round(&self) -> u32 {
        self.race.round
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_id_string())
    }
}

impl FromStr for EventId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for EventId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_id_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EventId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Session kinds, derived from an event title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    #[default]
    Race,
    SprintRace,
    Practice,
    Qualifying,
    SprintQualifying,
}

impl EventType {
    /// Classify an event title, case-insensitively.
    ///
    /// Precedence: exactly `sprint` is a sprint race; any other title
    /// containing `sprint` is sprint qualifying; then `practice`, then
    /// `qualifying`; anything else is a race.
    pub fn classify(title: &str) -> Self {
        let title = title.to_lowercase();
        if title == "sprint" {
            EventType::SprintRace
        } else if title.contains("sprint") {
            EventType::SprintQualifying
        } else if title.contains("practice") {
            EventType::Practice
        } else if title.contains("qualifying") {
            EventType::Qualifying
        } else {
            EventType::Race
        }
    }

    /// Classify the title segment of a stored event id
    pub fn of_event_id(id: &str) -> Result<Self> {
        Ok(Self::classify(&EventId::title_of(id)?))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Race => "RACE",
            EventType::SprintRace => "SPRINT_RACE",
            EventType::Practice => "PRACTICE",
            EventType::Qualifying => "QUALIFYING",
            EventType::SprintQualifying => "SPRINT_QUALIFYING",
        }
    }

    pub fn all() -> &'static [EventType] {
        &[
            EventType::Race,
            EventType::SprintRace,
            EventType::Practice,
            EventType::Qualifying,
            EventType::SprintQualifying,
        ]
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EventType::all()
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidId(format!("Unknown event type: {}", s)))
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
