//! Task ledger — the authoritative record of every task's lifecycle.
//!
//! Dispatch order is FIFO by insertion; there is no priority scheme. The
//! whole ledger sits behind one async mutex so that `next_task`'s
//! check-and-mark is a single critical section — two workers can never be
//! handed the same task — and so completion and reclamation cannot race.
//!
//! Reclamation is the crux of fault tolerance: when a worker expires, its
//! in-flight tasks return to the dispatchable pool. A result arriving later
//! from that worker is stale and must be rejected, not silently accepted,
//! or it would overwrite a result produced by the replacement attempt.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use hive_core::task::{Task, TaskStatus};

/// Errors from ledger operations. Surfaced to workers as client errors;
/// none of them mutate state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(u64),

    #[error("unknown task id: {0}")]
    UnknownTask(u64),

    #[error("invalid transition for task {task_id}: {reason}")]
    InvalidTransition { task_id: u64, reason: String },
}

/// A completed task together with its result bytes.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub task: Task,
    pub result: Vec<u8>,
}

/// Task totals per status, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub unassigned: usize,
    pub in_flight: usize,
    pub complete: usize,
    pub failed: usize,
}

struct TaskEntry {
    task: Task,
    status: TaskStatus,
    /// Set while InFlight, cleared on reclaim.
    assigned_to: Option<String>,
    /// How many times this task has been reclaimed.
    attempts: u32,
    result: Option<Vec<u8>>,
}

struct Inner {
    /// FIFO dispatch order.
    entries: Vec<TaskEntry>,
    /// task_id → index into `entries`.
    index: HashMap<u64, usize>,
}

/// The ledger, shared between request handlers and the liveness sweeper.
#[derive(Clone)]
pub struct TaskLedger {
    inner: Arc<Mutex<Inner>>,
    /// Reclaim ceiling before a task is marked permanently Failed.
    max_retries: u32,
}

impl TaskLedger {
    pub fn new(max_retries: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: Vec::new(),
                index: HashMap::new(),
            })),
            max_retries,
        }
    }

    /// Seed the ledger for a job. All tasks start Unassigned.
    pub async fn load_tasks(&self, tasks: Vec<Task>) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().await;
        for task in tasks {
            if inner.index.contains_key(&task.task_id) {
                return Err(LedgerError::DuplicateTaskId(task.task_id));
            }
            let idx = inner.entries.len();
            inner.index.insert(task.task_id, idx);
            inner.entries.push(TaskEntry {
                task,
                status: TaskStatus::Unassigned,
                assigned_to: None,
                attempts: 0,
                result: None,
            });
        }
        Ok(())
    }

    /// Atomically select the first Unassigned task, mark it InFlight under
    /// `connection_id`, and return it. None when nothing is dispatchable —
    /// the caller distinguishes "starved, retry later" from "job done" via
    /// [`TaskLedger::is_job_done`].
    pub async fn next_task(&self, connection_id: &str) -> Option<Task> {
        let mut inner = self.inner.lock().await;
        let entry = inner
            .entries
            .iter_mut()
            .find(|e| e.status == TaskStatus::Unassigned)?;
        entry.status = TaskStatus::InFlight;
        entry.assigned_to = Some(connection_id.to_string());
        tracing::debug!(
            task_id = entry.task.task_id,
            connection_id,
            "task dispatched"
        );
        Some(entry.task.clone())
    }

    /// Store a result and mark the task Complete.
    ///
    /// Rejected with `InvalidTransition` unless the task is InFlight AND
    /// still assigned to `connection_id` — a stale result from a worker
    /// whose assignment was reclaimed leaves the ledger untouched.
    pub async fn complete_task(
        &self,
        task_id: u64,
        connection_id: &str,
        result: Vec<u8>,
    ) -> Result<(), LedgerError> {
        let mut inner = self.inner.lock().await;
        let idx = *inner
            .index
            .get(&task_id)
            .ok_or(LedgerError::UnknownTask(task_id))?;
        let entry = &mut inner.entries[idx];

        if entry.status != TaskStatus::InFlight {
            return Err(LedgerError::InvalidTransition {
                task_id,
                reason: format!("task is {:?}, not in_flight", entry.status),
            });
        }
        if entry.assigned_to.as_deref() != Some(connection_id) {
            return Err(LedgerError::InvalidTransition {
                task_id,
                reason: format!("not assigned to {connection_id}"),
            });
        }

        entry.status = TaskStatus::Complete;
        entry.result = Some(result);
        tracing::info!(task_id, connection_id, "task complete");
        Ok(())
    }

    /// Revert every task InFlight under `connection_id` to Unassigned,
    /// making it dispatchable again. A task reclaimed more times than the
    /// retry ceiling is marked permanently Failed instead. Returns the
    /// affected task ids.
    pub async fn reclaim(&self, connection_id: &str) -> Vec<u64> {
        let mut inner = self.inner.lock().await;
        let mut reclaimed = Vec::new();
        for entry in inner.entries.iter_mut() {
            if entry.status == TaskStatus::InFlight
                && entry.assigned_to.as_deref() == Some(connection_id)
            {
                entry.assigned_to = None;
                entry.attempts += 1;
                if entry.attempts > self.max_retries {
                    entry.status = TaskStatus::Failed;
                    tracing::warn!(
                        task_id = entry.task.task_id,
                        attempts = entry.attempts,
                        "retry ceiling exceeded, task permanently failed"
                    );
                } else {
                    entry.status = TaskStatus::Unassigned;
                }
                reclaimed.push(entry.task.task_id);
            }
        }
        reclaimed
    }

    /// True iff every task is Complete or permanently Failed.
    pub async fn is_job_done(&self) -> bool {
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .all(|e| matches!(e.status, TaskStatus::Complete | TaskStatus::Failed))
    }

    /// Completed tasks with their results, in ledger order.
    pub async fn completed_tasks(&self) -> Vec<CompletedTask> {
        let inner = self.inner.lock().await;
        inner
            .entries
            .iter()
            .filter(|e| e.status == TaskStatus::Complete)
            .map(|e| CompletedTask {
                task: e.task.clone(),
                result: e.result.clone().unwrap_or_default(),
            })
            .collect()
    }

    pub async fn counts(&self) -> TaskCounts {
        let inner = self.inner.lock().await;
        let mut counts = TaskCounts::default();
        for entry in &inner.entries {
            match entry.status {
                TaskStatus::Unassigned => counts.unassigned += 1,
                TaskStatus::InFlight => counts.in_flight += 1,
                TaskStatus::Complete => counts.complete += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }
}
