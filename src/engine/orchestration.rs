//! Module focusing on the way records are driven from the source to the store in chunks

use std::fmt;

use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::{
    Error,
    config::PipelineConfig,
    error::RunFailure,
    engine::Enricher,
    input::{PositionToken, RecordSource},
    output::write_chunk,
    store::Store,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => f.write_str("running"),
            RunStatus::Completed => f.write_str("completed"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

/// Outcome of one run of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Records decoded from the source
    pub read: u64,
    /// Records persisted
    pub written: u64,
    /// Records filtered out by validation
    pub rejected: u64,
    /// Items that failed to read or write and were skipped
    pub skipped: u64,
    /// Transactions committed
    pub commits: u64,
    /// Source position covered by the last commit
    pub checkpoint: PositionToken,
}

impl RunReport {
    fn started(checkpoint: PositionToken) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Running,
            read: 0,
            written: 0,
            rejected: 0,
            skipped: 0,
            commits: 0,
            checkpoint,
        }
    }
}

struct SkipPolicy {
    limit: usize,
    skipped: usize,
}

impl SkipPolicy {
    fn new(limit: usize) -> Self {
        Self { limit, skipped: 0 }
    }

    fn skip(&mut self, error: Error, on_skip: &mut impl FnMut(&Error)) -> Result<(), Error> {
        if self.skipped >= self.limit {
            return Err(Error::SkipLimitExceeded {
                limit: self.limit,
                last: Box::new(error),
            });
        }
        self.skipped += 1;
        on_skip(&error);
        Ok(())
    }
}

///
/// Drives records from `source` through `enricher` into `store`, committing one transaction per chunk.
/// Items failing to read or write are handed to `on_skip` and skipped until the skip limit is exceeded.
///
pub(crate) fn run_chunks<S: Store>(
    source: &mut RecordSource,
    enricher: &mut Enricher,
    store: &mut S,
    config: &PipelineConfig,
    mut on_skip: impl FnMut(&Error),
) -> Result<RunReport, RunFailure> {
    let mut report = RunReport::started(config.resume_from);
    let span = info_span!("run", run_id = %report.run_id);
    let _guard = span.enter();

    let result = config
        .validate()
        .and_then(|()| source.open())
        .and_then(|()| drive(source, enricher, store, config, &mut report, &mut on_skip));
    source.close();

    match result {
        Ok(()) => {
            report.status = RunStatus::Completed;
            info!(
                read = report.read,
                written = report.written,
                rejected = report.rejected,
                skipped = report.skipped,
                commits = report.commits,
                checkpoint = %report.checkpoint,
                "run completed"
            );
            Ok(report)
        }
        Err(err) => {
            report.status = RunStatus::Failed;
            warn!(
                read = report.read,
                written = report.written,
                rejected = report.rejected,
                skipped = report.skipped,
                checkpoint = %report.checkpoint,
                "run failed: {err}"
            );
            Err(RunFailure { report, error: err })
        }
    }
}

fn drive<S: Store>(
    source: &mut RecordSource,
    enricher: &mut Enricher,
    store: &mut S,
    config: &PipelineConfig,
    report: &mut RunReport,
    on_skip: &mut impl FnMut(&Error),
) -> Result<(), Error> {
    let mut skips = SkipPolicy::new(config.skip_limit);

    loop {
        let mut chunk = Vec::with_capacity(config.chunk_size);
        // source position right after each accepted record, aligned with `chunk`
        let mut positions = Vec::with_capacity(config.chunk_size);
        let mut exhausted = false;

        // the chunk size counts items read, whether they end up accepted, rejected or skipped
        for _ in 0..config.chunk_size {
            match source.next_record() {
                Ok(Some(record)) => {
                    report.read += 1;
                    match enricher.process(record) {
                        Some(enriched) => {
                            chunk.push(enriched);
                            positions.push(source.checkpoint());
                        }
                        None => report.rejected += 1,
                    }
                }
                Ok(None) => {
                    exhausted = true;
                    break;
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    skips.skip(err, on_skip)?;
                    report.skipped += 1;
                }
            }
        }

        if !chunk.is_empty() {
            match write_chunk(store, &chunk) {
                Ok(()) => {
                    report.written += chunk.len() as u64;
                    report.commits += 1;
                }
                Err(err) => {
                    warn!("chunk rolled back, writing its records one by one: {err}");
                    for (record, position) in chunk.iter().zip(&positions) {
                        match write_chunk(store, std::slice::from_ref(record)) {
                            Ok(()) => {
                                report.written += 1;
                                report.commits += 1;
                            }
                            Err(err) => {
                                skips.skip(err, on_skip)?;
                                report.skipped += 1;
                            }
                        }
                        // everything up to this record is resolved, so an abort later in the
                        // scan must not hand this record to a resumed run again
                        report.checkpoint = *position;
                    }
                }
            }
        }

        report.checkpoint = source.checkpoint();
        info!(
            written = report.written,
            checkpoint = %report.checkpoint,
            "chunk processed"
        );

        if exhausted {
            return Ok(());
        }
    }
}
