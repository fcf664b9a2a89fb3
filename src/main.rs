use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use spectator_ingest::{
    DEFAULT_CHUNK_SIZE, DEFAULT_SKIP_LIMIT, Error, FormatSelector, MemoryStore, PipelineConfig,
    PositionToken, RecordSource, SqliteStore, Store, run, setup_logging, statistics_report,
};

/// Ingests spectator attendance records and prints the resulting statistics as CSV
#[derive(Parser, Debug)]
#[command(name = "spectator-ingest")]
#[command(version)]
struct Args {
    /// Input file (.json or .xml)
    input: PathBuf,

    /// Input format: auto (by file suffix), json or xml
    #[arg(long, default_value = "auto", env = "SOURCE_TYPE")]
    source_type: FormatSelector,

    /// Items read per transaction
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, env = "CHUNK_SIZE")]
    chunk_size: usize,

    /// Failed items tolerated before the run is aborted
    #[arg(long, default_value_t = DEFAULT_SKIP_LIMIT, env = "SKIP_LIMIT")]
    skip_limit: usize,

    /// SQLite database file; an in-memory store is used when omitted
    #[arg(long, env = "DATABASE_PATH")]
    database: Option<PathBuf>,

    /// Number of items already committed by an earlier run
    #[arg(long, default_value_t = 0)]
    resume_from: u64,
}

fn main() -> Result<()> {
    setup_logging()?;
    let args = Args::parse();

    let config = PipelineConfig {
        chunk_size: args.chunk_size,
        skip_limit: args.skip_limit,
        resume_from: PositionToken::new(args.resume_from),
    };
    let source = RecordSource::from_path(&args.input, args.source_type);

    match &args.database {
        Some(path) => {
            let mut store = SqliteStore::open(path)
                .with_context(|| format!("failed to open database {}", path.display()))?;
            ingest(source, &mut store, &config)
        }
        None => ingest(source, &mut MemoryStore::new(), &config),
    }
}

fn ingest<S: Store>(source: RecordSource, store: &mut S, config: &PipelineConfig) -> Result<()> {
    let report = run(source, store, config, handle_skip).context("ingestion run failed")?;
    tracing::info!(run_id = %report.run_id, status = %report.status, "done");

    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for record in statistics_report(store)? {
        wtr.serialize(&record)?;
    }
    wtr.flush()?;

    Ok(())
}

// Just logs the skipped item; the run report carries the count
fn handle_skip(error: &Error) {
    tracing::warn!("skipped: {error}")
}
