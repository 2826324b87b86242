// ABOUTME: Main library module for the renewd automation service
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod orchestrator;
pub mod scheduler;
pub mod store;

// Re-export commonly used types
pub use cli::{App, Args, Config};
pub use engine::{BrowserSession, LinkMatch, SessionFactory, SessionOptions, WorkflowEngine};
pub use orchestrator::{Orchestrator, OrchestratorError};
pub use scheduler::Scheduler;
pub use store::{ActionType, NewTask, RunResult, Task, TaskPatch, TaskStore};

// Error handling
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
