//! Module for the core logic of the pipeline: enrichment of records and the orchestration of chunks

pub(crate) mod orchestration;

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{EnrichedRecord, SpectatorRecord};


/// Number of accepted records seen per spectator during one run.
///
/// Lives only in memory and is owned by a single [`Enricher`]; two pipelines sharing one input
/// stream would each count only the records they saw.
#[derive(Debug, Default)]
pub struct VisitCounter {
    visits: HashMap<String, u32>,
}

impl VisitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more visit and returns the new total.
    pub fn record_visit(&mut self, spectator_id: &str) -> u32 {
        if let Some(count) = self.visits.get_mut(spectator_id) {
            *count += 1;
            *count
        } else {
            self.visits.insert(spectator_id.to_string(), 1);
            1
        }
    }

    pub fn visits(&self, spectator_id: &str) -> u32 {
        self.visits.get(spectator_id).copied().unwrap_or(0)
    }

    /// Number of distinct spectators seen.
    pub fn spectators(&self) -> usize {
        self.visits.len()
    }
}

/// Validates records and attaches the running visit count and behavior category.
#[derive(Debug, Default)]
pub struct Enricher {
    counter: VisitCounter,
}

impl Enricher {
    pub fn new(counter: VisitCounter) -> Self {
        Self { counter }
    }

    /// Returns `None` for records that must not be persisted: a missing or blank spectator id,
    /// or an age that is not positive. Rejected records leave the counter untouched.
    pub fn process(&mut self, record: SpectatorRecord) -> Option<EnrichedRecord> {
        let spectator_id = match &record.spectator_id {
            Some(id) if !id.trim().is_empty() => id.clone(),
            _ => {
                debug!("rejected record without spectator id");
                return None;
            }
        };
        if record.age <= 0 {
            debug!(%spectator_id, age = record.age, "rejected record with non-positive age");
            return None;
        }

        let total_matches = self.counter.record_visit(&spectator_id);
        let enriched = EnrichedRecord::new(spectator_id, record, total_matches);
        debug!(
            spectator_id = enriched.spectator_id(),
            total_matches,
            category = %enriched.category(),
            "record enriched"
        );
        Some(enriched)
    }

    pub fn counter(&self) -> &VisitCounter {
        &self.counter
    }

    pub fn into_counter(self) -> VisitCounter {
        self.counter
    }
}
