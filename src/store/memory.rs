use std::collections::BTreeMap;

use crate::domain::{EntryLogRecord, SpectatorProfile, SpectatorStatistics, Stored};
use crate::store::{Store, StoreError, StoreTx};

#[derive(Debug)]
struct Tables {
    spectators: BTreeMap<String, SpectatorProfile>,
    entries: Vec<Stored<EntryLogRecord>>,
    // keyed by spectator id: at most one statistics row per profile
    statistics: BTreeMap<String, Stored<SpectatorStatistics>>,
    next_entry_id: i64,
    next_statistics_id: i64,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            spectators: BTreeMap::new(),
            entries: Vec::new(),
            statistics: BTreeMap::new(),
            next_entry_id: 1,
            next_statistics_id: 1,
        }
    }
}

/// Store keeping all tables in memory. Enforces the same key and reference
/// constraints as the SQLite schema.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    type Tx<'a> = MemoryTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        let next_ids = (self.tables.next_entry_id, self.tables.next_statistics_id);
        Ok(MemoryTx {
            tables: &mut self.tables,
            undo: Vec::new(),
            next_ids,
            committed: false,
        })
    }

    fn spectators(&self) -> Result<Vec<SpectatorProfile>, StoreError> {
        Ok(self.tables.spectators.values().cloned().collect())
    }

    fn entries(&self) -> Result<Vec<Stored<EntryLogRecord>>, StoreError> {
        Ok(self.tables.entries.clone())
    }

    fn statistics(&self) -> Result<Vec<Stored<SpectatorStatistics>>, StoreError> {
        Ok(self.tables.statistics.values().cloned().collect())
    }
}

// Inverse of one write, applied in reverse order on rollback
#[derive(Debug)]
enum Undo {
    RemoveSpectator(String),
    RestoreSpectator(SpectatorProfile),
    PopEntry,
    RemoveStatistics(String),
    RestoreStatistics(Stored<SpectatorStatistics>),
}

/// Writes straight into the tables and records how to revert each write. Dropping the
/// transaction without commit replays that log backwards, so the cost of a transaction
/// depends on its own writes only.
pub struct MemoryTx<'a> {
    tables: &'a mut Tables,
    undo: Vec<Undo>,
    next_ids: (i64, i64),
    committed: bool,
}

impl StoreTx for MemoryTx<'_> {
    fn find_spectator(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<SpectatorProfile>, StoreError> {
        Ok(self.tables.spectators.get(spectator_id).cloned())
    }

    fn insert_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        if self.tables.spectators.contains_key(&profile.spectator_id) {
            return Err(StoreError::Constraint(format!(
                "duplicate spectator id {}",
                profile.spectator_id
            )));
        }
        self.tables
            .spectators
            .insert(profile.spectator_id.clone(), profile.clone());
        self.undo
            .push(Undo::RemoveSpectator(profile.spectator_id.clone()));
        Ok(())
    }

    fn update_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        let Some(existing) = self.tables.spectators.get_mut(&profile.spectator_id) else {
            return Err(StoreError::Constraint(format!(
                "update of unknown spectator {}",
                profile.spectator_id
            )));
        };
        let previous = std::mem::replace(existing, profile.clone());
        self.undo.push(Undo::RestoreSpectator(previous));
        Ok(())
    }

    fn insert_entry(&mut self, entry: &EntryLogRecord) -> Result<i64, StoreError> {
        self.ensure_spectator_exists(&entry.spectator_id)?;

        let id = self.tables.next_entry_id;
        self.tables.next_entry_id += 1;
        self.tables.entries.push(Stored {
            id,
            row: entry.clone(),
        });
        self.undo.push(Undo::PopEntry);
        Ok(id)
    }

    fn find_statistics(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<Stored<SpectatorStatistics>>, StoreError> {
        Ok(self.tables.statistics.get(spectator_id).cloned())
    }

    fn insert_statistics(&mut self, statistics: &SpectatorStatistics) -> Result<i64, StoreError> {
        self.ensure_spectator_exists(&statistics.spectator_id)?;
        if self.tables.statistics.contains_key(&statistics.spectator_id) {
            return Err(StoreError::Constraint(format!(
                "statistics already exist for spectator {}",
                statistics.spectator_id
            )));
        }

        let id = self.tables.next_statistics_id;
        self.tables.next_statistics_id += 1;
        self.tables.statistics.insert(
            statistics.spectator_id.clone(),
            Stored {
                id,
                row: statistics.clone(),
            },
        );
        self.undo
            .push(Undo::RemoveStatistics(statistics.spectator_id.clone()));
        Ok(id)
    }

    fn update_statistics(
        &mut self,
        statistics: &Stored<SpectatorStatistics>,
    ) -> Result<(), StoreError> {
        match self.tables.statistics.get_mut(&statistics.row.spectator_id) {
            Some(existing) if existing.id == statistics.id => {
                let previous = std::mem::replace(existing, statistics.clone());
                self.undo.push(Undo::RestoreStatistics(previous));
                Ok(())
            }
            _ => Err(StoreError::Constraint(format!(
                "update of unknown statistics row {}",
                statistics.id
            ))),
        }
    }

    fn commit(mut self) -> Result<(), StoreError> {
        self.committed = true;
        Ok(())
    }
}

impl MemoryTx<'_> {
    fn ensure_spectator_exists(&self, spectator_id: &str) -> Result<(), StoreError> {
        if self.tables.spectators.contains_key(spectator_id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!(
                "reference to unknown spectator {spectator_id}"
            )))
        }
    }

    fn rollback(&mut self) {
        while let Some(undo) = self.undo.pop() {
            match undo {
                Undo::RemoveSpectator(id) => {
                    self.tables.spectators.remove(&id);
                }
                Undo::RestoreSpectator(profile) => {
                    self.tables
                        .spectators
                        .insert(profile.spectator_id.clone(), profile);
                }
                Undo::PopEntry => {
                    self.tables.entries.pop();
                }
                Undo::RemoveStatistics(id) => {
                    self.tables.statistics.remove(&id);
                }
                Undo::RestoreStatistics(stored) => {
                    self.tables
                        .statistics
                        .insert(stored.row.spectator_id.clone(), stored);
                }
            }
        }
        (self.tables.next_entry_id, self.tables.next_statistics_id) = self.next_ids;
    }
}

impl Drop for MemoryTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}
