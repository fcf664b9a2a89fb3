mod config;
mod domain;
mod engine;
mod error;
mod input;
mod output;
mod store;
mod telemetry;

pub use config::{DEFAULT_CHUNK_SIZE, DEFAULT_SKIP_LIMIT, PipelineConfig};
pub use domain::{
    BehaviorCategory, EnrichedRecord, EntryLogRecord, SeatLocation, SpectatorProfile,
    SpectatorRecord, SpectatorStatistics, Stored,
};
pub use engine::orchestration::{RunReport, RunStatus};
pub use engine::{Enricher, VisitCounter};
pub use error::{Error, RunFailure};
pub use input::{FormatSelector, PositionToken, RecordSource, SourceFormat};
pub use output::{StatisticsRecord, statistics_report, write_chunk};
pub use store::{MemoryStore, MemoryTx, SqliteStore, SqliteTx, Store, StoreError, StoreTx};
pub use telemetry::setup_logging;

/// Ingests spectator attendance records from `source` and persists them into `store`.
///
/// This is the single entry point for a run. Records are read from `source` in chunks of
/// [`PipelineConfig::chunk_size`] items, enriched with the running visit count and behavior
/// category of their spectator, and written to `store` in one transaction per chunk.
///
/// # Error handling
///
/// Not every item of the input may be usable. Records failing validation (no spectator id, an age
/// that is not positive) are filtered out silently and only counted in the returned [`RunReport`].
/// Items that cannot be decoded, and records whose write fails, are reported to the `on_skip`
/// callback and skipped. Once more than [`PipelineConfig::skip_limit`] items were skipped, the run
/// is aborted with [`Error::SkipLimitExceeded`]; chunks committed before that remain persisted, and
/// the [`RunFailure`] carries the report whose checkpoint a new run can resume from.
///
/// # Example
///
/// ```no_run
/// use spectator_ingest::{FormatSelector, PipelineConfig, RecordSource, SqliteStore, run};
///
/// let source = RecordSource::from_path("spectators.json", FormatSelector::Auto);
/// let mut store = SqliteStore::open("spectators.db").unwrap();
///
/// let report = run(source, &mut store, &PipelineConfig::default(), |e| eprintln!("skipped: {e}"))
///     .unwrap();
/// println!("{} records written", report.written);
/// ```
pub fn run<S: Store>(
    source: RecordSource,
    store: &mut S,
    config: &PipelineConfig,
    on_skip: impl FnMut(&Error),
) -> Result<RunReport, RunFailure> {
    let mut source = source.resuming_at(config.resume_from);
    let mut enricher = Enricher::new(VisitCounter::new());
    engine::orchestration::run_chunks(&mut source, &mut enricher, store, config, on_skip)
}
