use std::path::Path;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};

use crate::domain::{
    BehaviorCategory, EntryLogRecord, SeatLocation, SpectatorProfile, SpectatorStatistics, Stored,
};
use crate::store::{Store, StoreError, StoreTx};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS spectators (
    spectator_id   TEXT PRIMARY KEY,
    age            INTEGER NOT NULL,
    nationality    TEXT,
    total_matches  INTEGER NOT NULL,
    category       TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS match_entries (
    entry_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    spectator_id   TEXT NOT NULL REFERENCES spectators(spectator_id),
    match_id       TEXT,
    entry_time     TEXT,
    gate           TEXT,
    ticket_number  TEXT,
    ticket_type    TEXT,
    tribune        TEXT,
    bloc           TEXT,
    rang           TEXT,
    siege          TEXT
);
CREATE TABLE IF NOT EXISTS spectator_statistics (
    stats_id           INTEGER PRIMARY KEY AUTOINCREMENT,
    spectator_id       TEXT NOT NULL UNIQUE REFERENCES spectators(spectator_id),
    total_matches      INTEGER NOT NULL,
    behavior_category  TEXT NOT NULL
);
";

const SELECT_SPECTATOR: &str =
    "SELECT spectator_id, age, nationality, total_matches, category FROM spectators";
const SELECT_STATISTICS: &str =
    "SELECT stats_id, spectator_id, total_matches, behavior_category FROM spectator_statistics";

/// Store backed by a SQLite database. The schema is created on open if missing.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }
}

impl Store for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(SqliteTx {
            tx: self.conn.transaction()?,
        })
    }

    fn spectators(&self) -> Result<Vec<SpectatorProfile>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_SPECTATOR} ORDER BY spectator_id"))?;
        let rows = stmt.query_map([], profile_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn entries(&self) -> Result<Vec<Stored<EntryLogRecord>>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, spectator_id, match_id, entry_time, gate, ticket_number, ticket_type,
                    tribune, bloc, rang, siege
             FROM match_entries ORDER BY entry_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Stored {
                id: row.get(0)?,
                row: EntryLogRecord {
                    spectator_id: row.get(1)?,
                    match_id: row.get(2)?,
                    entry_time: row.get(3)?,
                    gate: row.get(4)?,
                    ticket_number: row.get(5)?,
                    ticket_type: row.get(6)?,
                    seat_location: SeatLocation {
                        tribune: row.get(7)?,
                        bloc: row.get(8)?,
                        rang: row.get(9)?,
                        siege: row.get(10)?,
                    },
                },
            })
        })?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    fn statistics(&self) -> Result<Vec<Stored<SpectatorStatistics>>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_STATISTICS} ORDER BY spectator_id"))?;
        let rows = stmt.query_map([], statistics_from_row)?;
        Ok(rows.collect::<Result<_, _>>()?)
    }
}

/// A SQLite transaction; rolled back when dropped uncommitted.
pub struct SqliteTx<'a> {
    tx: rusqlite::Transaction<'a>,
}

impl StoreTx for SqliteTx<'_> {
    fn find_spectator(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<SpectatorProfile>, StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(&format!("{SELECT_SPECTATOR} WHERE spectator_id = ?1"))?;
        Ok(stmt
            .query_row([spectator_id], profile_from_row)
            .optional()?)
    }

    fn insert_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO spectators (spectator_id, age, nationality, total_matches, category)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                profile.spectator_id,
                profile.age,
                profile.nationality,
                profile.total_matches,
                profile.category,
            ])?;
        Ok(())
    }

    fn update_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        let changed = self
            .tx
            .prepare_cached(
                "UPDATE spectators SET total_matches = ?2, category = ?3 WHERE spectator_id = ?1",
            )?
            .execute(params![
                profile.spectator_id,
                profile.total_matches,
                profile.category
            ])?;
        if changed == 0 {
            return Err(StoreError::Constraint(format!(
                "update of unknown spectator {}",
                profile.spectator_id
            )));
        }
        Ok(())
    }

    fn insert_entry(&mut self, entry: &EntryLogRecord) -> Result<i64, StoreError> {
        let seat = &entry.seat_location;
        self.tx
            .prepare_cached(
                "INSERT INTO match_entries (spectator_id, match_id, entry_time, gate, ticket_number,
                                            ticket_type, tribune, bloc, rang, siege)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?
            .execute(params![
                entry.spectator_id,
                entry.match_id,
                entry.entry_time,
                entry.gate,
                entry.ticket_number,
                entry.ticket_type,
                seat.tribune,
                seat.bloc,
                seat.rang,
                seat.siege,
            ])?;
        Ok(self.tx.last_insert_rowid())
    }

    fn find_statistics(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<Stored<SpectatorStatistics>>, StoreError> {
        let mut stmt = self
            .tx
            .prepare_cached(&format!("{SELECT_STATISTICS} WHERE spectator_id = ?1"))?;
        Ok(stmt
            .query_row([spectator_id], statistics_from_row)
            .optional()?)
    }

    fn insert_statistics(&mut self, statistics: &SpectatorStatistics) -> Result<i64, StoreError> {
        self.tx
            .prepare_cached(
                "INSERT INTO spectator_statistics (spectator_id, total_matches, behavior_category)
                 VALUES (?1, ?2, ?3)",
            )?
            .execute(params![
                statistics.spectator_id,
                statistics.total_matches,
                statistics.behavior_category,
            ])?;
        Ok(self.tx.last_insert_rowid())
    }

    fn update_statistics(
        &mut self,
        statistics: &Stored<SpectatorStatistics>,
    ) -> Result<(), StoreError> {
        let changed = self
            .tx
            .prepare_cached(
                "UPDATE spectator_statistics SET total_matches = ?2, behavior_category = ?3
                 WHERE stats_id = ?1",
            )?
            .execute(params![
                statistics.id,
                statistics.row.total_matches,
                statistics.row.behavior_category,
            ])?;
        if changed == 0 {
            return Err(StoreError::Constraint(format!(
                "update of unknown statistics row {}",
                statistics.id
            )));
        }
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        self.tx.commit()?;
        Ok(())
    }
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<SpectatorProfile> {
    Ok(SpectatorProfile {
        spectator_id: row.get(0)?,
        age: row.get(1)?,
        nationality: row.get(2)?,
        total_matches: row.get(3)?,
        category: row.get(4)?,
    })
}

fn statistics_from_row(row: &Row<'_>) -> rusqlite::Result<Stored<SpectatorStatistics>> {
    Ok(Stored {
        id: row.get(0)?,
        row: SpectatorStatistics {
            spectator_id: row.get(1)?,
            total_matches: row.get(2)?,
            behavior_category: row.get(3)?,
        },
    })
}

impl ToSql for BehaviorCategory {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.name()))
    }
}

impl FromSql for BehaviorCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|msg: String| FromSqlError::Other(msg.into()))
    }
}
