//! Module for the types defining the spectator domain.

mod record;
mod tables;

use std::fmt;
use std::str::FromStr;

pub use record::{EnrichedRecord, SeatLocation, SpectatorRecord};
pub use tables::{EntryLogRecord, SpectatorProfile, SpectatorStatistics, Stored};

/// Behavior classification of a spectator, derived from the number of matches attended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BehaviorCategory {
    FirstVisit,
    Occasional,
    Regular,
    SuperFan,
}

impl BehaviorCategory {
    /// Tier for a running total of matches. Totals are at least 1 for every accepted record;
    /// a total of 0 is mapped like a first visit so the function stays total.
    pub fn from_total_matches(total_matches: u32) -> Self {
        match total_matches {
            0 | 1 => BehaviorCategory::FirstVisit,
            2..=3 => BehaviorCategory::Occasional,
            4..=6 => BehaviorCategory::Regular,
            _ => BehaviorCategory::SuperFan,
        }
    }

    /// Name under which the category is persisted.
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorCategory::FirstVisit => "FIRST_VISIT",
            BehaviorCategory::Occasional => "OCCASIONAL",
            BehaviorCategory::Regular => "REGULAR",
            BehaviorCategory::SuperFan => "SUPER_FAN",
        }
    }
}

impl fmt::Display for BehaviorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BehaviorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIRST_VISIT" => Ok(BehaviorCategory::FirstVisit),
            "OCCASIONAL" => Ok(BehaviorCategory::Occasional),
            "REGULAR" => Ok(BehaviorCategory::Regular),
            "SUPER_FAN" => Ok(BehaviorCategory::SuperFan),
            other => Err(format!("unknown behavior category: {other}")),
        }
    }
}
