// ABOUTME: Recurring job scheduling with per-task execution exclusivity
// ABOUTME: Maps enabled tasks to timers and bounds concurrent runs with a worker limit

pub mod error;
pub mod guard;

mod jobs;

pub use error::{Result, SchedulerError};
pub use guard::{RunGuard, RunPermit};
pub use jobs::Scheduler;
