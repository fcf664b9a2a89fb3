//! Module defining the records flowing from the source through the enrichment step

use chrono::NaiveDateTime;

use crate::domain::BehaviorCategory;

/// Where the spectator was seated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatLocation {
    pub tribune: Option<String>,
    pub bloc: Option<String>,
    pub rang: Option<String>,
    pub siege: Option<String>,
}

/// One attendance record as it comes out of the source, before any validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpectatorRecord {
    pub spectator_id: Option<String>,
    pub age: i32,
    pub nationality: Option<String>,
    pub match_id: Option<String>,
    pub entry_time: Option<NaiveDateTime>,
    pub gate: Option<String>,
    pub ticket_number: Option<String>,
    pub ticket_type: Option<String>,
    pub seat_location: Option<SeatLocation>,
}

/// A record that passed validation, carrying the visit count at the time it was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    spectator_id: String,
    record: SpectatorRecord,
    total_matches: u32,
    category: BehaviorCategory,
}

impl EnrichedRecord {
    pub(crate) fn new(spectator_id: String, record: SpectatorRecord, total_matches: u32) -> Self {
        Self {
            spectator_id,
            record,
            total_matches,
            category: BehaviorCategory::from_total_matches(total_matches),
        }
    }

    pub fn spectator_id(&self) -> &str {
        &self.spectator_id
    }

    pub fn record(&self) -> &SpectatorRecord {
        &self.record
    }

    pub fn total_matches(&self) -> u32 {
        self.total_matches
    }

    pub fn category(&self) -> BehaviorCategory {
        self.category
    }
}
