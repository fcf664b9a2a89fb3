//! Integration tests for resuming an aborted run from its checkpoint against a persistent store.

use claims::{assert_err, assert_ok};
use spectator_ingest::{PipelineConfig, SqliteStore, Store, run, statistics_report};

use crate::source;

fn input() -> String {
    let mut items: Vec<String> = (1..=4)
        .map(|i| format!(r#"{{"spectatorId":"S{i}","age":30,"matchId":"M1"}}"#))
        .collect();
    // undecodable entry time, skipped by the first run
    items.insert(
        2,
        r#"{"spectatorId":"S9","age":30,"entryTime":"half past seven"}"#.to_string(),
    );
    items.push(r#"{"spectatorId":"S1","age":30,"matchId":"M2"}"#.to_string());
    format!("[{}]", items.join(","))
}

#[test]
fn aborted_run_resumes_after_its_last_commit() {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("spectators.db");
    let strict = PipelineConfig {
        chunk_size: 2,
        skip_limit: 0,
        ..PipelineConfig::default()
    };

    // Act: the first run commits S1 and S2, then aborts on the third item
    let failure = {
        let mut store = SqliteStore::open(&db).unwrap();
        assert_err!(run(source("input.json", &input()), &mut store, &strict, |_| {}))
    };
    assert_eq!(failure.report.checkpoint.items(), 2);

    // a second run with a tolerant policy picks up from the checkpoint, on a reopened store
    let mut store = SqliteStore::open(&db).unwrap();
    let tolerant = PipelineConfig {
        skip_limit: 1,
        resume_from: failure.report.checkpoint,
        ..strict
    };
    let report = assert_ok!(run(source("input.json", &input()), &mut store, &tolerant, |_| {}));

    // Assert
    assert_eq!(report.skipped, 1);
    assert_eq!(report.written, 3);
    assert_eq!(report.checkpoint.items(), 6);

    let ids: Vec<String> = store
        .spectators()
        .unwrap()
        .into_iter()
        .map(|p| p.spectator_id)
        .collect();
    assert_eq!(ids, vec!["S1", "S2", "S3", "S4"]);
    assert_eq!(store.entries().unwrap().len(), 5);
    assert_eq!(assert_ok!(statistics_report(&store)).len(), 4);
}
