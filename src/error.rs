//! Module defining the errors which are exposed to the users of the crate

use crate::engine::orchestration::RunReport;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The pipeline cannot start, e.g., an input with an unsupported format
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O failure while reading the input
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single record that cannot be decoded; the source can continue with the next one
    #[error("malformed record at position {position}: {message}")]
    MalformedRecord { position: u64, message: String },

    /// The input stream itself is damaged; no further records can be read from it, so the run fails
    #[error("malformed input at position {position}: {message}")]
    MalformedInput { position: u64, message: String },

    /// The store rejected a write; the surrounding transaction was rolled back
    #[error("write error: {0}")]
    Write(#[from] StoreError),

    /// More items failed than the configured skip limit tolerates
    #[error("skip limit of {limit} exceeded, last failure: {last}")]
    SkipLimitExceeded { limit: usize, last: Box<Error> },
}

impl Error {
    /// Fatal errors abort the run; all other errors concern a single item and are subject to the skip policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::MalformedInput { .. }
                | Error::SkipLimitExceeded { .. }
        )
    }
}

pub(crate) fn configuration_error(message: impl Into<String>) -> Error {
    Error::Configuration(message.into())
}

pub(crate) fn malformed_record(position: u64, message: impl Into<String>) -> Error {
    Error::MalformedRecord {
        position,
        message: message.into(),
    }
}

pub(crate) fn malformed_input(position: u64, message: impl Into<String>) -> Error {
    Error::MalformedInput {
        position,
        message: message.into(),
    }
}

/// A run that was aborted. The report tells how far it got; its checkpoint is where a new run resumes.
#[derive(Debug, thiserror::Error)]
#[error("run {} failed after {} items: {}", .report.run_id, .report.checkpoint, .error)]
pub struct RunFailure {
    pub report: RunReport,
    #[source]
    pub error: Error,
}
