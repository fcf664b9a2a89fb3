//! Integration tests running whole inputs through the public entry point and inspecting the store.

use claims::{assert_none, assert_ok, assert_some};
use rstest::rstest;
use spectator_ingest::{
    BehaviorCategory, FormatSelector, MemoryStore, PipelineConfig, RecordSource, SqliteStore,
    Store, statistics_report, run,
};

use crate::{fixture_path, source};

const TWO_VISITS_AND_AN_INVALID_AGE: &str = r#"[
  {"spectatorId":"S1","age":30,"nationality":"French","matchId":"M1","entryTime":"2025-01-11T18:30:00"},
  {"spectatorId":"S1","age":30,"nationality":"French","matchId":"M2","entryTime":"2025-01-18T20:00:00"},
  {"spectatorId":"S2","age":-1,"nationality":"Spanish","matchId":"M2"}
]"#;

#[test]
fn repeated_spectator_becomes_occasional_and_invalid_one_is_dropped() {
    // Arrange
    let mut store = MemoryStore::new();

    // Act
    let report = assert_ok!(run(
        source("input.json", TWO_VISITS_AND_AN_INVALID_AGE),
        &mut store,
        &PipelineConfig::default(),
        |e| panic!("unexpected skip: {e}"),
    ));

    // Assert
    assert_eq!(report.read, 3);
    assert_eq!(report.written, 2);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.skipped, 0);

    let profiles = store.spectators().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].spectator_id, "S1");
    assert_eq!(profiles[0].total_matches, 2);
    assert_eq!(profiles[0].category, BehaviorCategory::Occasional);

    let entries = store.entries().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.row.spectator_id == "S1"));
    assert_eq!(
        entries.iter().map(|e| e.row.match_id.as_deref()).collect::<Vec<_>>(),
        vec![Some("M1"), Some("M2")]
    );

    let statistics = store.statistics().unwrap();
    assert_eq!(statistics.len(), 1);
    assert_eq!(statistics[0].row.total_matches, 2);
    assert_eq!(statistics[0].row.behavior_category, "OCCASIONAL");
}

#[rstest]
#[case(1, BehaviorCategory::FirstVisit)]
#[case(3, BehaviorCategory::Occasional)]
#[case(4, BehaviorCategory::Regular)]
#[case(6, BehaviorCategory::Regular)]
#[case(7, BehaviorCategory::SuperFan)]
fn category_follows_visit_count_across_chunks(
    #[case] visits: usize,
    #[case] expected: BehaviorCategory,
) {
    // Arrange
    let body = (0..visits)
        .map(|i| format!(r#"{{"spectatorId":"S1","age":44,"matchId":"M{i}"}}"#))
        .collect::<Vec<_>>()
        .join(",");
    let config = PipelineConfig {
        chunk_size: 2,
        ..PipelineConfig::default()
    };
    let mut store = MemoryStore::new();

    // Act
    assert_ok!(run(
        source("input.json", &format!("[{body}]")),
        &mut store,
        &config,
        |_| {}
    ));

    // Assert
    let profiles = store.spectators().unwrap();
    assert_eq!(profiles[0].total_matches as usize, visits);
    assert_eq!(profiles[0].category, expected);
    assert_eq!(store.entries().unwrap().len(), visits);
}

#[rstest]
#[case("spectators.json")]
#[case("spectators.xml")]
fn fixtures_produce_the_same_report_in_memory_and_in_sqlite(#[case] fixture: &str) {
    // Arrange
    let dir = tempfile::tempdir().unwrap();
    let mut sqlite = SqliteStore::open(dir.path().join("spectators.db")).unwrap();
    let mut memory = MemoryStore::new();
    let config = PipelineConfig {
        chunk_size: 3,
        ..PipelineConfig::default()
    };

    // Act
    let in_sqlite = assert_ok!(run(
        RecordSource::from_path(fixture_path(fixture), FormatSelector::Auto),
        &mut sqlite,
        &config,
        |_| {}
    ));
    let in_memory = assert_ok!(run(
        RecordSource::from_path(fixture_path(fixture), FormatSelector::Auto),
        &mut memory,
        &config,
        |_| {}
    ));

    // Assert
    for report in [&in_sqlite, &in_memory] {
        assert_eq!(report.read, 10);
        assert_eq!(report.written, 8);
        assert_eq!(report.rejected, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.checkpoint.items(), 11);
    }
    assert_ne!(in_sqlite.run_id, in_memory.run_id);
    assert_eq!(
        statistics_report(&sqlite).unwrap(),
        statistics_report(&memory).unwrap()
    );
    assert_eq!(sqlite.entries().unwrap(), memory.entries().unwrap());
}

#[rstest]
#[case("spectators.json")]
#[case("spectators.xml")]
fn seat_and_entry_details_are_persisted(#[case] fixture: &str) {
    let mut store = MemoryStore::new();

    assert_ok!(run(
        RecordSource::from_path(fixture_path(fixture), FormatSelector::Auto),
        &mut store,
        &PipelineConfig::default(),
        |_| {}
    ));

    let entries = store.entries().unwrap();
    let first = &entries[0].row;
    assert_eq!(first.spectator_id, "S1");
    assert_eq!(first.gate.as_deref(), Some("G1"));
    assert_eq!(first.ticket_number.as_deref(), Some("T-0001"));
    assert_eq!(first.seat_location.tribune.as_deref(), Some("North"));
    assert_eq!(first.seat_location.rang.as_deref(), Some("3"));
    assert_eq!(first.seat_location.siege.as_deref(), Some("12"));
    assert_some!(first.entry_time);

    // numbers in identifier fields are kept as text
    let second = &entries[1].row;
    assert_eq!(second.spectator_id, "S3");
    assert_eq!(second.gate.as_deref(), Some("4"));
    assert_eq!(second.ticket_number.as_deref(), Some("1002"));
    assert_none!(second.seat_location.tribune.as_deref());
}
