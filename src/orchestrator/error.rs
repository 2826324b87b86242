// ABOUTME: Error types surfaced to the external API layer
// ABOUTME: Bad input and unknown ids are structured; run failures are RunResults, not errors

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("invalid task definition: {0}")]
    Config(String),

    #[error("task not found: {id}")]
    NotFound { id: String },

    #[error("task already running: {id}")]
    AlreadyRunning { id: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
