// ABOUTME: Recurring timer jobs that fire workflow runs for enabled tasks
// ABOUTME: Each fire re-fetches the stored task so edits apply without rescheduling

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::error::{Result, SchedulerError};
use super::guard::RunGuard;
use crate::engine::WorkflowEngine;
use crate::store::{LogLevel, RunResult, Task, TaskStore};

/// Maintains a one-to-one mapping from enabled task ids to recurring timer
/// jobs. Cross-task runs execute concurrently up to the worker limit; runs
/// for the same task id never overlap (see [`RunGuard`]).
pub struct Scheduler {
    store: Arc<TaskStore>,
    engine: Arc<WorkflowEngine>,
    guard: Arc<RunGuard>,
    workers: Arc<Semaphore>,
    jobs: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(store: Arc<TaskStore>, engine: Arc<WorkflowEngine>, max_concurrent: usize) -> Self {
        Self {
            store,
            engine,
            guard: RunGuard::new(),
            workers: Arc::new(Semaphore::new(max_concurrent.max(1))),
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Register a recurring job for `task`, replacing any existing job for
    /// the same id. The first fire happens after one full interval; there is
    /// no immediate fire on schedule.
    pub fn schedule(&self, task: &Task) {
        let period = Duration::from_secs(task.interval.max(1).saturating_mul(3600));
        let id = task.id.clone();
        let store = Arc::clone(&self.store);
        let engine = Arc::clone(&self.engine);
        let guard = Arc::clone(&self.guard);
        let workers = Arc::clone(&self.workers);

        info!(task_id = %id, interval_hours = task.interval, "scheduling recurring job");

        let job_id = id.clone();
        let handle = tokio::spawn(async move {
            loop {
                sleep(period).await;

                // Always fire with the current stored definition, not the
                // snapshot captured at schedule time.
                let current = match store.get_by_id(&id).await {
                    Some(task) => task,
                    None => {
                        debug!(task_id = %id, "task deleted, stopping job");
                        break;
                    }
                };
                if !current.enabled {
                    debug!(task_id = %id, "task disabled, stopping job");
                    break;
                }

                Self::fire(&store, &engine, &guard, &workers, current).await;
            }
        });

        let mut jobs = self.jobs.lock().expect("scheduler job table poisoned");
        if let Some(old) = jobs.remove(&job_id) {
            old.abort();
        }
        jobs.insert(job_id, handle);
    }

    /// Cancel the recurring job for `id` if one exists. An in-flight run is
    /// never interrupted; only future fires are prevented.
    pub fn unschedule(&self, id: &str) {
        let mut jobs = self.jobs.lock().expect("scheduler job table poisoned");
        if let Some(handle) = jobs.remove(id) {
            handle.abort();
            info!(task_id = %id, "recurring job cancelled");
        }
    }

    /// Schedule when enabled, unschedule otherwise.
    pub fn reschedule(&self, task: &Task) {
        if task.enabled {
            self.schedule(task);
        } else {
            self.unschedule(&task.id);
        }
    }

    /// Whether a recurring job exists for `id`.
    pub fn has_job(&self, id: &str) -> bool {
        self.jobs
            .lock()
            .expect("scheduler job table poisoned")
            .contains_key(id)
    }

    /// Whether a run for `id` is currently in flight.
    pub fn is_running(&self, id: &str) -> bool {
        self.guard.is_running(id)
    }

    /// One scheduled fire: claim the task's run slot, take a worker permit,
    /// run the workflow, and persist the result. A fire that finds the task
    /// still running is skipped and logged, never queued.
    async fn fire(
        store: &Arc<TaskStore>,
        engine: &Arc<WorkflowEngine>,
        guard: &Arc<RunGuard>,
        workers: &Arc<Semaphore>,
        task: Task,
    ) {
        let Some(_permit) = RunGuard::try_acquire(guard, &task.id) else {
            warn!(task_id = %task.id, task_name = %task.name, "previous run still in flight, skipping fire");
            if let Err(e) = store
                .append_log(
                    &task.id,
                    LogLevel::Info,
                    "scheduled fire skipped: previous run still in flight",
                )
                .await
            {
                warn!(task_id = %task.id, error = %e, "failed to log skipped fire");
            }
            return;
        };

        let _slot = workers
            .acquire()
            .await
            .expect("scheduler worker semaphore closed");

        info!(task_id = %task.id, task_name = %task.name, "scheduled fire");
        let result = engine.run(&task).await;
        if let Err(e) = store.update_result(&task.id, result).await {
            error!(task_id = %task.id, error = %e, "failed to persist run result");
        }
    }

    /// Run a task immediately, bypassing its timer. Refused (not queued) when
    /// a run for the task is already in flight.
    pub async fn run_now(&self, id: &str) -> Result<RunResult> {
        let task = self
            .store
            .get_by_id(id)
            .await
            .ok_or_else(|| SchedulerError::NotFound { id: id.to_string() })?;

        let Some(_permit) = RunGuard::try_acquire(&self.guard, id) else {
            return Err(SchedulerError::AlreadyRunning { id: id.to_string() });
        };

        let _slot = self
            .workers
            .acquire()
            .await
            .expect("scheduler worker semaphore closed");

        info!(task_id = %id, task_name = %task.name, "manual run");
        let result = self.engine.run(&task).await;
        if let Err(e) = self.store.update_result(id, result.clone()).await {
            error!(task_id = %id, error = %e, "failed to persist run result");
        }
        Ok(result)
    }

    /// Cancel all recurring jobs. In-flight runs are left to finish.
    pub fn shutdown(&self) {
        let mut jobs = self.jobs.lock().expect("scheduler job table poisoned");
        for (_, handle) in jobs.drain() {
            handle.abort();
        }
        info!("scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
