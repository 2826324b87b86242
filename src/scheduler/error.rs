// ABOUTME: Error types for scheduling and manual run requests
// ABOUTME: Structured errors surfaced to the orchestrator, never to a run itself

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("task not found: {id}")]
    NotFound { id: String },

    #[error("task already running: {id}")]
    AlreadyRunning { id: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
