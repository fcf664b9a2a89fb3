//! Module defining the rows persisted by the writer

use chrono::NaiveDateTime;

use crate::domain::{BehaviorCategory, EnrichedRecord, SeatLocation};

/// A row together with the key the store generated for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored<T> {
    pub id: i64,
    pub row: T,
}

/// Keyed by `spectator_id`. Age and nationality are set on first sighting and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectatorProfile {
    pub spectator_id: String,
    pub age: i32,
    pub nationality: Option<String>,
    pub total_matches: u32,
    pub category: BehaviorCategory,
}

impl SpectatorProfile {
    pub(crate) fn first_sighting(record: &EnrichedRecord) -> Self {
        Self {
            spectator_id: record.spectator_id().to_string(),
            age: record.record().age,
            nationality: record.record().nationality.clone(),
            total_matches: record.total_matches(),
            category: record.category(),
        }
    }

    pub(crate) fn seen_again(&mut self, record: &EnrichedRecord) {
        self.total_matches = record.total_matches();
        self.category = record.category();
    }
}

/// One immutable row per accepted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLogRecord {
    pub spectator_id: String,
    pub match_id: Option<String>,
    pub entry_time: Option<NaiveDateTime>,
    pub gate: Option<String>,
    pub ticket_number: Option<String>,
    pub ticket_type: Option<String>,
    pub seat_location: SeatLocation,
}

impl From<&EnrichedRecord> for EntryLogRecord {
    fn from(record: &EnrichedRecord) -> Self {
        let raw = record.record();
        Self {
            spectator_id: record.spectator_id().to_string(),
            match_id: raw.match_id.clone(),
            entry_time: raw.entry_time,
            gate: raw.gate.clone(),
            ticket_number: raw.ticket_number.clone(),
            ticket_type: raw.ticket_type.clone(),
            seat_location: raw.seat_location.clone().unwrap_or_default(),
        }
    }
}

/// Reporting snapshot of a profile. Kept consistent with [`SpectatorProfile`] within every commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpectatorStatistics {
    pub spectator_id: String,
    pub total_matches: u32,
    pub behavior_category: String,
}

impl SpectatorStatistics {
    pub(crate) fn snapshot(profile: &SpectatorProfile) -> Self {
        Self {
            spectator_id: profile.spectator_id.clone(),
            total_matches: profile.total_matches,
            behavior_category: profile.category.name().to_string(),
        }
    }
}
