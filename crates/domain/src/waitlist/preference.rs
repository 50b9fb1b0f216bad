//! Time-of-day preference.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Hour (exclusive) at which the morning ends.
const NOON: u32 = 12;

/// When during the day a customer would like to be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimePreference {
    Morning,
    Afternoon,
    #[default]
    Any,
}

impl TimePreference {
    /// Returns true if a slot starting at `start` satisfies the preference.
    ///
    /// The hour is read in UTC. Slots carry no clinic time zone, so a clinic
    /// outside UTC sees the noon boundary shifted by its offset.
    pub fn accepts(&self, start: DateTime<Utc>) -> bool {
        match self {
            TimePreference::Morning => start.hour() < NOON,
            TimePreference::Afternoon => start.hour() >= NOON,
            TimePreference::Any => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimePreference::Morning => "morning",
            TimePreference::Afternoon => "afternoon",
            TimePreference::Any => "any",
        }
    }
}

impl std::fmt::Display for TimePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TimePreference {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimePreference::Morning),
            "afternoon" => Ok(TimePreference::Afternoon),
            "any" => Ok(TimePreference::Any),
            other => Err(DomainError::UnknownStatus {
                kind: "time preference",
                value: other.to_string(),
            }),
        }
    }
}
