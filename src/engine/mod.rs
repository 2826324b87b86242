// ABOUTME: Workflow engine executing one browser run per task
// ABOUTME: Sequences navigation, challenge handling, login, action search, and verification

pub mod error;
pub mod heuristics;
pub mod remote;
pub mod session;

mod runner;

pub use error::{EngineError, Result};
pub use remote::RemoteSessionFactory;
pub use runner::WorkflowEngine;
pub use session::{BrowserSession, LinkMatch, SessionFactory, SessionOptions};
