// ABOUTME: Error types for workflow runs and the browser session capability
// ABOUTME: Every variant is converted into a failed RunResult at the run boundary

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("browser session failed to start: {0}")]
    BrowserLaunch(String),

    #[error("browser session error: {0}")]
    Session(String),

    #[error("{0} field not found on login page")]
    FieldNotFound(&'static str),

    #[error("action control not found")]
    ActionNotFound,

    #[error("run exceeded timeout budget of {0}s")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
