//! Module for everything leaving the engine: the transactional writer persisting enriched records,
//! and the statistics report read back from the store.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::Error;
use crate::domain::{EnrichedRecord, EntryLogRecord, SpectatorProfile, SpectatorStatistics};
use crate::store::{Store, StoreError, StoreTx};


/// Persists `records` in one transaction: for every record, upserts the spectator profile,
/// appends an entry-log row and upserts the statistics row.
///
/// If any write fails, the transaction is dropped uncommitted and none of the records are persisted.
pub fn write_chunk<S: Store>(store: &mut S, records: &[EnrichedRecord]) -> Result<(), Error> {
    let mut tx = store.begin()?;
    for record in records {
        write_record(&mut tx, record)?;
    }
    tx.commit()?;
    debug!(records = records.len(), "chunk written");
    Ok(())
}

fn write_record(tx: &mut impl StoreTx, record: &EnrichedRecord) -> Result<(), StoreError> {
    let profile = match tx.find_spectator(record.spectator_id())? {
        None => {
            let profile = SpectatorProfile::first_sighting(record);
            tx.insert_spectator(&profile)?;
            profile
        }
        Some(mut profile) => {
            profile.seen_again(record);
            tx.update_spectator(&profile)?;
            profile
        }
    };

    tx.insert_entry(&EntryLogRecord::from(record))?;

    match tx.find_statistics(&profile.spectator_id)? {
        None => {
            tx.insert_statistics(&SpectatorStatistics::snapshot(&profile))?;
        }
        Some(mut statistics) => {
            statistics.row = SpectatorStatistics::snapshot(&profile);
            tx.update_statistics(&statistics)?;
        }
    }
    Ok(())
}

/// One line of the statistics report.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StatisticsRecord {
    pub spectator_id: String,
    pub age: i32,
    pub nationality: Option<String>,
    pub total_matches: u32,
    pub category: String,
}

/// Joins the statistics table with the profile demographics, ordered by spectator id.
///
/// Fails if a profile and its statistics row disagree, which would mean a commit broke the
/// invariant that both are written together.
pub fn statistics_report<S: Store>(store: &S) -> Result<Vec<StatisticsRecord>, Error> {
    let mut statistics: HashMap<String, SpectatorStatistics> = store
        .statistics()?
        .into_iter()
        .map(|stored| (stored.row.spectator_id.clone(), stored.row))
        .collect();

    store
        .spectators()?
        .into_iter()
        .map(|profile| {
            let Some(stats) = statistics.remove(&profile.spectator_id) else {
                return Err(corrupt(format!(
                    "spectator {} has no statistics row",
                    profile.spectator_id
                )));
            };
            if stats.total_matches != profile.total_matches
                || stats.behavior_category != profile.category.name()
            {
                return Err(corrupt(format!(
                    "statistics of spectator {} diverge from the profile",
                    profile.spectator_id
                )));
            }
            Ok(StatisticsRecord {
                spectator_id: profile.spectator_id,
                age: profile.age,
                nationality: profile.nationality,
                total_matches: stats.total_matches,
                category: stats.behavior_category,
            })
        })
        .collect()
}

fn corrupt(message: String) -> Error {
    Error::Write(StoreError::Corrupt(message))
}
