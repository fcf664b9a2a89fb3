//! Module defining the knobs of a pipeline run

use crate::error::{Error, configuration_error};
use crate::input::PositionToken;

pub const DEFAULT_CHUNK_SIZE: usize = 10;
pub const DEFAULT_SKIP_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of items read per transaction
    pub chunk_size: usize,
    /// Failed items tolerated per run before it is aborted
    pub skip_limit: usize,
    /// Checkpoint of an earlier run to continue from
    pub resume_from: PositionToken,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            skip_limit: DEFAULT_SKIP_LIMIT,
            resume_from: PositionToken::default(),
        }
    }
}

impl PipelineConfig {
    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.chunk_size == 0 {
            return Err(configuration_error("chunk size must be at least 1"));
        }
        Ok(())
    }
}
