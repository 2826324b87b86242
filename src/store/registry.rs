// ABOUTME: JSON-backed task store with wholesale atomic snapshot rewrites
// ABOUTME: Single-writer discipline via an async RwLock held across each persist

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::error::{Result, StoreError};
use super::task::{LogLevel, NewTask, RunResult, Task, TaskPatch};

const SNAPSHOT_FILE: &str = "tasks.json";
const LOG_DIR: &str = "logs";

/// Durable registry of task definitions and their latest run results.
///
/// The whole registry lives in one JSON document that is rewritten atomically
/// (temp file + rename) on every mutation, so a concurrent reader of the file
/// never observes a partial write. Mutations apply in memory first; a failed
/// persist surfaces as [`StoreError::Io`] while the in-memory state keeps the
/// mutation.
pub struct TaskStore {
    data_dir: PathBuf,
    tasks: RwLock<Vec<Task>>,
}

impl TaskStore {
    /// Open (or initialize) a store rooted at `data_dir`.
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;
        tokio::fs::create_dir_all(data_dir.join(LOG_DIR)).await?;

        let tasks = Self::load_snapshot(&data_dir.join(SNAPSHOT_FILE)).await;
        debug!(count = tasks.len(), dir = %data_dir.display(), "task store opened");

        Ok(Self {
            data_dir,
            tasks: RwLock::new(tasks),
        })
    }

    async fn load_snapshot(path: &Path) -> Vec<Task> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "task snapshot unreadable, starting empty");
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read task snapshot, starting empty");
                Vec::new()
            }
        }
    }

    /// Rewrite the snapshot file. Called with the write lock held so only
    /// one persist is ever in flight.
    fn persist(&self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.data_dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.persist(self.data_dir.join(SNAPSHOT_FILE))
            .map_err(|e| StoreError::Io(e.error))?;
        Ok(())
    }

    /// Current snapshot in insertion order.
    pub async fn get_all(&self) -> Vec<Task> {
        self.tasks.read().await.clone()
    }

    pub async fn get_by_id(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.iter().find(|t| t.id == id).cloned()
    }

    /// Append a new task, assigning a fresh id and filling defaults.
    pub async fn add(&self, fields: NewTask) -> Result<Task> {
        let task = Task::from_new(fields);
        let mut tasks = self.tasks.write().await;
        tasks.push(task.clone());
        self.persist(&tasks)?;
        Ok(task)
    }

    /// Merge a partial update into an existing task. Returns `None` for an
    /// unknown id; the patch's `id` field (if any) is ignored.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(None);
        };
        task.apply_patch(patch);
        let updated = task.clone();
        self.persist(&tasks)?;
        Ok(Some(updated))
    }

    /// Remove a task. Reports whether a record existed.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.persist(&tasks)?;
        Ok(true)
    }

    /// Record the outcome of a run. Silently no-ops when the task was deleted
    /// while its run was in flight.
    pub async fn update_result(&self, id: &str, result: RunResult) -> Result<()> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "discarding run result for deleted task");
            return Ok(());
        };
        task.last_run = Some(Utc::now());
        task.last_result = Some(result);
        self.persist(&tasks)?;
        Ok(())
    }

    fn log_path(&self, id: &str) -> PathBuf {
        self.data_dir.join(LOG_DIR).join(format!("task_{id}.log"))
    }

    /// Append one line to the task's durable log file.
    pub async fn append_log(&self, id: &str, level: LogLevel, message: &str) -> Result<()> {
        let line = format!(
            "[{}] [{}] {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S"),
            level,
            message
        );
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path(id))
            .await?;
        file.write_all(line.as_bytes()).await?;
        Ok(())
    }

    /// Full contents of the task's log file; empty when none exists yet.
    pub async fn get_logs(&self, id: &str) -> Result<String> {
        match tokio::fs::read_to_string(self.log_path(id)).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
