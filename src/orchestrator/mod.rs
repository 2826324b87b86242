// ABOUTME: Process-wide coordinator wiring the task store, scheduler, and engine
// ABOUTME: Translates lifecycle requests into store mutations plus schedule changes

pub mod error;

pub use error::{OrchestratorError, Result};

use std::sync::Arc;

use tracing::info;

use crate::engine::WorkflowEngine;
use crate::scheduler::{Scheduler, SchedulerError};
use crate::store::{NewTask, RunResult, Task, TaskPatch, TaskStore};

/// Owns the scheduler and fronts the task lifecycle for the external API
/// layer: CRUD, enable/disable, and manual runs. Constructed once at process
/// start and shared by handle.
pub struct Orchestrator {
    store: Arc<TaskStore>,
    scheduler: Scheduler,
}

impl Orchestrator {
    pub fn new(
        store: Arc<TaskStore>,
        engine: Arc<WorkflowEngine>,
        max_concurrent_runs: usize,
    ) -> Self {
        let scheduler = Scheduler::new(Arc::clone(&store), engine, max_concurrent_runs);
        Self { store, scheduler }
    }

    /// Schedule every enabled task from the persisted snapshot. Called once
    /// at boot.
    pub async fn start(&self) {
        let tasks = self.store.get_all().await;
        let mut scheduled = 0;
        for task in &tasks {
            if task.enabled {
                self.scheduler.schedule(task);
                scheduled += 1;
            }
        }
        info!(total = tasks.len(), scheduled, "orchestrator started");
    }

    pub async fn list(&self) -> Vec<Task> {
        self.store.get_all().await
    }

    pub async fn get(&self, id: &str) -> Result<Task> {
        self.store
            .get_by_id(id)
            .await
            .ok_or_else(|| OrchestratorError::NotFound { id: id.to_string() })
    }

    /// Validate and persist a new task, scheduling it when enabled. Invalid
    /// definitions are rejected before anything is stored.
    pub async fn create(&self, fields: NewTask) -> Result<Task> {
        if fields.url.trim().is_empty() {
            return Err(OrchestratorError::Config("url is required".to_string()));
        }
        if fields.username.trim().is_empty() {
            return Err(OrchestratorError::Config("username is required".to_string()));
        }
        if fields.password.is_empty() {
            return Err(OrchestratorError::Config("password is required".to_string()));
        }

        let task = self.store.add(fields).await?;
        if task.enabled {
            self.scheduler.schedule(&task);
        }
        info!(task_id = %task.id, task_name = %task.name, "task created");
        Ok(task)
    }

    /// Merge a partial update and bring the task's job in line with its
    /// (possibly changed) enabled flag and interval. Edits that leave the
    /// schedule alone never touch the job: replacing it would reset the
    /// timer's phase, and each fire re-fetches the stored definition anyway.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Task> {
        let before = self.get(id).await?;
        let task = self
            .store
            .update(id, patch)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound { id: id.to_string() })?;
        if task.enabled != before.enabled || task.interval != before.interval {
            self.scheduler.reschedule(&task);
        }
        info!(task_id = %task.id, "task updated");
        Ok(task)
    }

    /// Remove a task and cancel its recurring job. Reports whether a record
    /// existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        self.scheduler.unschedule(id);
        let existed = self.store.delete(id).await?;
        if existed {
            info!(task_id = %id, "task deleted");
        }
        Ok(existed)
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<Task> {
        self.update(
            id,
            TaskPatch {
                enabled: Some(enabled),
                ..Default::default()
            },
        )
        .await
    }

    /// Run a task immediately. Refused when the task is already running.
    pub async fn run_now(&self, id: &str) -> Result<RunResult> {
        self.scheduler.run_now(id).await.map_err(|e| match e {
            SchedulerError::NotFound { id } => OrchestratorError::NotFound { id },
            SchedulerError::AlreadyRunning { id } => OrchestratorError::AlreadyRunning { id },
        })
    }

    pub async fn get_logs(&self, id: &str) -> Result<String> {
        // Distinguish unknown ids from tasks that simply have no log yet.
        self.get(id).await?;
        Ok(self.store.get_logs(id).await?)
    }

    /// Whether a recurring job exists for `id`. Exposed for status reporting.
    pub fn is_scheduled(&self, id: &str) -> bool {
        self.scheduler.has_job(id)
    }

    /// Whether a run for `id` is currently in flight.
    pub fn is_running(&self, id: &str) -> bool {
        self.scheduler.is_running(id)
    }

    /// Cancel all recurring jobs; in-flight runs finish on their own.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
