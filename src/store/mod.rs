//! Module defining the persistent store the writer works against.
//!
//! The store is a set of three tables addressed by key. All writes happen inside a
//! [`StoreTx`]; a transaction that is dropped without [`StoreTx::commit`] leaves no trace.

mod memory;
mod sqlite;

pub use memory::{MemoryStore, MemoryTx};
pub use sqlite::{SqliteStore, SqliteTx};

use crate::domain::{EntryLogRecord, SpectatorProfile, SpectatorStatistics, Stored};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A write violating a key or reference constraint
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Persisted data that cannot be mapped back to domain types
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub trait Store {
    type Tx<'a>: StoreTx
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError>;

    /// All profiles, ordered by spectator id.
    fn spectators(&self) -> Result<Vec<SpectatorProfile>, StoreError>;

    /// All entry-log rows, in insertion order.
    fn entries(&self) -> Result<Vec<Stored<EntryLogRecord>>, StoreError>;

    /// All statistics rows, ordered by spectator id.
    fn statistics(&self) -> Result<Vec<Stored<SpectatorStatistics>>, StoreError>;
}

/// Operations available inside one transaction. Lookups return `None` for absent rows.
pub trait StoreTx {
    fn find_spectator(&mut self, spectator_id: &str)
    -> Result<Option<SpectatorProfile>, StoreError>;

    fn insert_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError>;

    fn update_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError>;

    /// Appends an entry and returns its generated key.
    fn insert_entry(&mut self, entry: &EntryLogRecord) -> Result<i64, StoreError>;

    fn find_statistics(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<Stored<SpectatorStatistics>>, StoreError>;

    /// Inserts the statistics row of a profile and returns its generated key.
    fn insert_statistics(&mut self, statistics: &SpectatorStatistics) -> Result<i64, StoreError>;

    fn update_statistics(
        &mut self,
        statistics: &Stored<SpectatorStatistics>,
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>;
}
