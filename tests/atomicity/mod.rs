//! Integration tests for the all-or-nothing chunk commit, using a store that fails on demand.

use claims::{assert_err, assert_matches, assert_ok};
use spectator_ingest::{
    EnrichedRecord, Enricher, EntryLogRecord, Error, MemoryStore, MemoryTx, PipelineConfig,
    SpectatorProfile, SpectatorRecord, SpectatorStatistics, Store, StoreError, StoreTx, Stored,
    VisitCounter, run, statistics_report, write_chunk,
};

use crate::source;

/// Delegates to a [`MemoryStore`] but refuses to write the statistics row of one spectator.
struct FailingStore {
    inner: MemoryStore,
    poisoned: &'static str,
}

impl FailingStore {
    fn new(poisoned: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            poisoned,
        }
    }
}

struct FailingTx<'a> {
    inner: MemoryTx<'a>,
    poisoned: &'static str,
}

impl FailingTx<'_> {
    fn check(&self, statistics: &SpectatorStatistics) -> Result<(), StoreError> {
        if statistics.spectator_id == self.poisoned {
            return Err(StoreError::Constraint(format!(
                "statistics of {} cannot be written",
                self.poisoned
            )));
        }
        Ok(())
    }
}

impl Store for FailingStore {
    type Tx<'a> = FailingTx<'a>;

    fn begin(&mut self) -> Result<Self::Tx<'_>, StoreError> {
        Ok(FailingTx {
            inner: self.inner.begin()?,
            poisoned: self.poisoned,
        })
    }

    fn spectators(&self) -> Result<Vec<SpectatorProfile>, StoreError> {
        self.inner.spectators()
    }

    fn entries(&self) -> Result<Vec<Stored<EntryLogRecord>>, StoreError> {
        self.inner.entries()
    }

    fn statistics(&self) -> Result<Vec<Stored<SpectatorStatistics>>, StoreError> {
        self.inner.statistics()
    }
}

impl StoreTx for FailingTx<'_> {
    fn find_spectator(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<SpectatorProfile>, StoreError> {
        self.inner.find_spectator(spectator_id)
    }

    fn insert_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        self.inner.insert_spectator(profile)
    }

    fn update_spectator(&mut self, profile: &SpectatorProfile) -> Result<(), StoreError> {
        self.inner.update_spectator(profile)
    }

    fn insert_entry(&mut self, entry: &EntryLogRecord) -> Result<i64, StoreError> {
        self.inner.insert_entry(entry)
    }

    fn find_statistics(
        &mut self,
        spectator_id: &str,
    ) -> Result<Option<Stored<SpectatorStatistics>>, StoreError> {
        self.inner.find_statistics(spectator_id)
    }

    fn insert_statistics(&mut self, statistics: &SpectatorStatistics) -> Result<i64, StoreError> {
        self.check(statistics)?;
        self.inner.insert_statistics(statistics)
    }

    fn update_statistics(
        &mut self,
        statistics: &Stored<SpectatorStatistics>,
    ) -> Result<(), StoreError> {
        self.check(&statistics.row)?;
        self.inner.update_statistics(statistics)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.inner.commit()
    }
}

fn entry(id: &str) -> String {
    format!(r#"{{"spectatorId":"{id}","age":30,"matchId":"M1"}}"#)
}

fn enriched(enricher: &mut Enricher, id: &str) -> EnrichedRecord {
    enricher
        .process(SpectatorRecord {
            spectator_id: Some(id.to_string()),
            age: 30,
            ..SpectatorRecord::default()
        })
        .expect("valid record")
}

#[test]
fn failing_record_rolls_back_its_whole_chunk() {
    // Arrange: the failure hits the statistics write of the third record
    let mut store = FailingStore::new("P");
    let mut enricher = Enricher::new(VisitCounter::new());
    let chunk: Vec<EnrichedRecord> = ["S1", "S2", "P", "S3"]
        .into_iter()
        .map(|id| enriched(&mut enricher, id))
        .collect();

    // Act
    let err = assert_err!(write_chunk(&mut store, &chunk));

    // Assert: profiles and entries of the records before it are gone as well
    assert_matches!(err, Error::Write(StoreError::Constraint(_)));
    assert!(store.spectators().unwrap().is_empty());
    assert!(store.entries().unwrap().is_empty());
    assert!(store.statistics().unwrap().is_empty());

    // the store is still usable afterwards
    assert_ok!(write_chunk(&mut store, &chunk[..2]));
    assert_eq!(store.spectators().unwrap().len(), 2);
}

#[test]
fn records_committed_by_an_aborted_scan_are_not_read_again() {
    // Arrange: S1 and S2 form the first chunk, S3 and P the second
    let input = format!(
        "[{},{},{},{},{}]",
        entry("S1"),
        entry("S2"),
        entry("S3"),
        entry("P"),
        entry("S4")
    );
    let mut store = FailingStore::new("P");
    let config = PipelineConfig {
        chunk_size: 2,
        skip_limit: 0,
        ..PipelineConfig::default()
    };

    // Act
    let failure = assert_err!(run(source("input.json", &input), &mut store, &config, |_| {}));

    // Assert: the scan of the second chunk saved S3 before P exceeded the limit; S4 was never read
    assert_matches!(failure.error, Error::SkipLimitExceeded { limit: 0, .. });
    assert_eq!(failure.report.commits, 2);
    assert_eq!(failure.report.read, 4);
    assert_eq!(failure.report.checkpoint.items(), 3);

    let ids: Vec<String> = store
        .spectators()
        .unwrap()
        .into_iter()
        .map(|p| p.spectator_id)
        .collect();
    assert_eq!(ids, vec!["S1", "S2", "S3"]);
    assert!(store.entries().unwrap().iter().all(|e| e.row.spectator_id != "P"));

    // Act: once P can be written, a run resumed at the checkpoint starts right at P
    store.poisoned = "";
    let resumed = PipelineConfig {
        resume_from: failure.report.checkpoint,
        ..config
    };
    let report = assert_ok!(run(source("input.json", &input), &mut store, &resumed, |_| {}));

    // Assert
    assert_eq!(report.read, 2);
    assert_eq!(report.checkpoint.items(), 5);
    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 5);
    assert_eq!(
        entries.iter().filter(|e| e.row.spectator_id == "S3").count(),
        1
    );
    let s3 = store
        .spectators()
        .unwrap()
        .into_iter()
        .find(|p| p.spectator_id == "S3")
        .expect("S3 was committed by the first run");
    assert_eq!(s3.total_matches, 1);
}

#[test]
fn scan_mode_skips_only_the_failing_record() {
    // Arrange
    let input = format!(
        "[{},{},{},{}]",
        entry("S1"),
        entry("P"),
        entry("S2"),
        entry("S1")
    );
    let mut store = FailingStore::new("P");
    let mut skipped: Vec<String> = Vec::new();

    // Act
    let report = assert_ok!(run(
        source("input.json", &input),
        &mut store,
        &PipelineConfig::default(),
        |e| skipped.push(e.to_string())
    ));

    // Assert
    assert_eq!(report.read, 4);
    assert_eq!(report.written, 3);
    assert_eq!(report.skipped, 1);
    assert_eq!(skipped.len(), 1);
    assert!(skipped[0].contains("statistics of P"), "{}", skipped[0]);

    // every committed record left a profile, an entry and a consistent statistics row
    let report_rows = assert_ok!(statistics_report(&store.inner));
    assert_eq!(report_rows.len(), 2);
    assert_eq!(report_rows[0].spectator_id, "S1");
    assert_eq!(report_rows[0].total_matches, 2);
    assert_eq!(store.entries().unwrap().len(), 3);
}

#[test]
fn rolled_back_chunk_leaves_no_partial_rows() {
    let input = format!("[{},{}]", entry("S1"), entry("P"));
    let mut store = FailingStore::new("P");
    let config = PipelineConfig {
        skip_limit: 0,
        ..PipelineConfig::default()
    };

    let failure = assert_err!(run(source("input.json", &input), &mut store, &config, |_| {}));

    // S1 was committed alone during the scan; P neither has a profile nor an entry
    assert_matches!(failure.error, Error::SkipLimitExceeded { .. });
    assert_eq!(store.spectators().unwrap().len(), 1);
    assert_eq!(store.entries().unwrap().len(), 1);
    assert_eq!(store.statistics().unwrap().len(), 1);
    assert_eq!(failure.report.written, 1);
}
