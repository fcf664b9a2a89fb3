//! Integration tests for choosing the reader by suffix or by configuration.

use std::io::Cursor;

use claims::{assert_err, assert_matches, assert_ok};
use rstest::rstest;
use spectator_ingest::{
    Error, FormatSelector, MemoryStore, PipelineConfig, RecordSource, SourceFormat, Store, run,
};

use crate::{fixture_path, source};

const ONE_XML_ENTRY: &str =
    "<spectators><spectatorEntry><spectatorId>S1</spectatorId><age>30</age></spectatorEntry></spectators>";

#[rstest]
#[case("x.json", r#"[{"spectatorId":"S1","age":30}]"#)]
#[case("x.xml", ONE_XML_ENTRY)]
#[case("UPPER.XML", ONE_XML_ENTRY)]
fn suffix_selects_the_reader(#[case] name: &str, #[case] input: &str) {
    let mut store = MemoryStore::new();

    let report = assert_ok!(run(source(name, input), &mut store, &PipelineConfig::default(), |_| {}));

    assert_eq!(report.written, 1);
    assert_eq!(store.spectators().unwrap()[0].spectator_id, "S1");
}

#[test]
fn unsupported_suffix_fails_the_run_before_reading() {
    let mut store = MemoryStore::new();

    let failure = assert_err!(run(
        source("x.csv", "spectatorId,age\nS1,30\n"),
        &mut store,
        &PipelineConfig::default(),
        |_| panic!("nothing should be skipped")
    ));

    assert_matches!(failure.error, Error::Configuration(_));
    assert!(failure.error.is_fatal());
    assert_eq!(failure.report.read, 0);
    assert!(store.spectators().unwrap().is_empty());
}

#[test]
fn explicit_source_type_wins_over_the_suffix() {
    let mut store = MemoryStore::new();
    let source = RecordSource::from_reader(
        "export.txt",
        Cursor::new(ONE_XML_ENTRY.as_bytes().to_vec()),
        FormatSelector::Explicit(SourceFormat::Xml),
    );

    let report = assert_ok!(run(source, &mut store, &PipelineConfig::default(), |_| {}));

    assert_eq!(report.written, 1);
}

#[test]
fn missing_input_file_is_reported() {
    let mut store = MemoryStore::new();
    let source = RecordSource::from_path(fixture_path("does_not_exist.json"), FormatSelector::Auto);

    let failure = assert_err!(run(source, &mut store, &PipelineConfig::default(), |_| {}));

    assert_matches!(failure.error, Error::Io(_));
}
