// ABOUTME: Per-task-id run exclusivity guard
// ABOUTME: A contended acquire is refused, never queued; permits release on drop

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Tracks task ids with a run currently in flight. Scheduled fires and manual
/// runs both go through this guard, so at most one run per task id exists at
/// any instant.
#[derive(Debug, Default)]
pub struct RunGuard {
    active: Mutex<HashSet<String>>,
}

impl RunGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Claim the run slot for `id`. Returns `None` when a run for that id is
    /// already in flight.
    pub fn try_acquire(guard: &Arc<Self>, id: &str) -> Option<RunPermit> {
        let mut active = guard.active.lock().expect("run guard poisoned");
        if !active.insert(id.to_string()) {
            return None;
        }
        Some(RunPermit {
            guard: Arc::clone(guard),
            id: id.to_string(),
        })
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.active.lock().expect("run guard poisoned").contains(id)
    }
}

/// Held for the duration of a run; releases the task's slot on drop.
#[derive(Debug)]
pub struct RunPermit {
    guard: Arc<RunGuard>,
    id: String,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.guard
            .active
            .lock()
            .expect("run guard poisoned")
            .remove(&self.id);
    }
}
