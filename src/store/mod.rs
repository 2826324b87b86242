// ABOUTME: Durable task registry backed by a single JSON snapshot
// ABOUTME: Exposes task CRUD, run results, and per-task append-only logs

pub mod error;
pub mod task;

mod registry;

pub use error::{Result, StoreError};
pub use registry::TaskStore;
pub use task::{ActionType, LogEntry, LogLevel, NewTask, RunResult, Task, TaskPatch};
