//! Coordinator — the per-job state machine over registry, ledger, and
//! file store.
//!
//! Constructed once per job run and handed by `Arc` to every request
//! handler and to the liveness sweeper. Holds no state of its own beyond
//! the job record; task and connection state live in their owning
//! components.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use hive_core::task::{Job, JobStatus, Task};

use crate::files::{FileError, FileStore};
use crate::ledger::{CompletedTask, LedgerError, TaskCounts, TaskLedger};
use crate::registry::{ConnectionInfo, ConnectionRegistry};

/// Job metadata returned on the job handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: u64,
    pub file_names: Vec<String>,
    pub task_count: usize,
}

/// Outcome of a task request.
#[derive(Debug, Clone)]
pub enum TaskDispatch {
    /// A task was assigned to the requesting worker.
    Assigned(Task),
    /// Nothing dispatchable right now, but the job is not done — in-flight
    /// work may yet be reclaimed. Retry later.
    Starved,
    /// Every task is accounted for. The worker can exit its loop.
    Exhausted,
}

/// Point-in-time view of the whole coordination state.
#[derive(Debug, Clone)]
pub struct CoordinatorStatus {
    pub job_id: u64,
    pub job_status: JobStatus,
    pub tasks: TaskCounts,
    pub connections: Vec<ConnectionInfo>,
}

/// Event hooks invoked synchronously before the default response is
/// constructed. All methods default to no-ops.
pub trait CoordinatorHooks: Send + Sync {
    fn on_job_request(&self, _connection_id: &str) {}
    fn on_task_request(&self, _connection_id: &str) {}
    fn on_file_request(&self, _job_id: u64, _file_name: &str) {}
}

/// The default hook set: does nothing.
pub struct NoopHooks;

impl CoordinatorHooks for NoopHooks {}

pub struct Coordinator {
    job: Mutex<Job>,
    registry: ConnectionRegistry,
    ledger: TaskLedger,
    files: FileStore,
    hooks: Arc<dyn CoordinatorHooks>,
    task_count: usize,
}

impl Coordinator {
    /// Build a coordinator for one job run, seeding the ledger with the
    /// task batch.
    pub async fn new(job: Job, tasks: Vec<Task>, max_retries: u32) -> Result<Self, LedgerError> {
        let ledger = TaskLedger::new(max_retries);
        let task_count = tasks.len();
        ledger.load_tasks(tasks).await?;
        let files = FileStore::new(job.job_id, job.job_path.clone());

        Ok(Self {
            job: Mutex::new(job),
            registry: ConnectionRegistry::new(),
            ledger,
            files,
            hooks: Arc::new(NoopHooks),
            task_count,
        })
    }

    /// Replace the default no-op hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn CoordinatorHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Job handshake: register (or refresh) the connection and hand back
    /// the job description. Repeatable.
    pub async fn handle_job_request(&self, connection_id: &str) -> JobDescriptor {
        self.hooks.on_job_request(connection_id);
        self.registry.register_or_touch(connection_id);

        let mut job = self.job.lock().await;
        if job.status == JobStatus::Pending {
            job.status = JobStatus::Running;
            tracing::info!(job_id = job.job_id, "job started");
        }

        JobDescriptor {
            job_id: job.job_id,
            file_names: job.file_names.clone(),
            task_count: self.task_count,
        }
    }

    /// Task request: dispatch the next unassigned task, or report why
    /// there is none. Any task request also counts as a liveness signal.
    pub async fn handle_task_request(&self, connection_id: &str) -> TaskDispatch {
        self.hooks.on_task_request(connection_id);
        self.registry.touch(connection_id);

        if let Some(task) = self.ledger.next_task(connection_id).await {
            return TaskDispatch::Assigned(task);
        }
        if self.ledger.is_job_done().await {
            self.mark_done_if_needed().await;
            TaskDispatch::Exhausted
        } else {
            TaskDispatch::Starved
        }
    }

    /// Result submission. Ledger rejections (stale, duplicate, unknown)
    /// propagate without mutating state.
    pub async fn handle_task_result(
        &self,
        task_id: u64,
        connection_id: &str,
        result: Vec<u8>,
    ) -> Result<(), LedgerError> {
        self.registry.touch(connection_id);
        self.ledger
            .complete_task(task_id, connection_id, result)
            .await?;

        if self.ledger.is_job_done().await {
            self.mark_done_if_needed().await;
        }
        Ok(())
    }

    /// File exchange, independent of task state.
    pub fn handle_file_request(&self, job_id: u64, file_name: &str) -> Result<Bytes, FileError> {
        self.hooks.on_file_request(job_id, file_name);
        self.files.fetch(job_id, file_name)
    }

    /// Heartbeat path.
    pub fn handle_heartbeat(&self, connection_id: &str) {
        self.registry.touch(connection_id);
    }

    /// One liveness sweep: expire silent connections and reclaim their
    /// in-flight tasks. Returns how many tasks were reclaimed. Runs on a
    /// recurring schedule, independent of request handling.
    pub async fn sweep(&self, timeout: Duration) -> usize {
        let expired = self.registry.sweep_expired(timeout);
        let mut total = 0;
        for connection_id in expired {
            let reclaimed = self.ledger.reclaim(&connection_id).await;
            tracing::info!(
                connection_id,
                tasks = reclaimed.len(),
                "worker expired, tasks reclaimed"
            );
            total += reclaimed.len();
        }
        total
    }

    pub async fn is_job_done(&self) -> bool {
        self.ledger.is_job_done().await
    }

    pub async fn completed_tasks(&self) -> Vec<CompletedTask> {
        self.ledger.completed_tasks().await
    }

    pub async fn status(&self) -> CoordinatorStatus {
        let job = self.job.lock().await;
        CoordinatorStatus {
            job_id: job.job_id,
            job_status: job.status,
            tasks: self.ledger.counts().await,
            connections: self.registry.snapshot(),
        }
    }

    async fn mark_done_if_needed(&self) {
        let mut job = self.job.lock().await;
        if job.status != JobStatus::Done {
            job.status = JobStatus::Done;
            tracing::info!(job_id = job.job_id, "job complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hive_core::task::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_task(task_id: u64) -> Task {
        Task {
            task_id,
            program: "./work.sh".into(),
            args: vec![],
            payload: vec![],
            output_file_name: format!("out_{task_id}.txt"),
            input_file_name: format!("in_{task_id}.txt"),
        }
    }

    fn make_job() -> Job {
        Job {
            job_id: 12,
            job_path: std::env::temp_dir(),
            file_names: vec!["test_file.txt".into()],
            status: JobStatus::Pending,
        }
    }

    async fn make_coordinator(n: u64) -> Coordinator {
        Coordinator::new(make_job(), (1..=n).map(make_task).collect(), 3)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn job_request_registers_and_describes() {
        let coordinator = make_coordinator(2).await;

        let descriptor = coordinator.handle_job_request("w1").await;
        assert_eq!(descriptor.job_id, 12);
        assert_eq!(descriptor.task_count, 2);
        assert_eq!(descriptor.file_names, vec!["test_file.txt"]);

        let status = coordinator.status().await;
        assert_eq!(status.job_status, JobStatus::Running);
        assert_eq!(status.connections.len(), 1);
    }

    #[tokio::test]
    async fn task_loop_runs_to_exhaustion() {
        let coordinator = make_coordinator(2).await;
        coordinator.handle_job_request("w1").await;

        let first = match coordinator.handle_task_request("w1").await {
            TaskDispatch::Assigned(task) => task,
            other => panic!("expected assignment, got {other:?}"),
        };
        let second = match coordinator.handle_task_request("w1").await {
            TaskDispatch::Assigned(task) => task,
            other => panic!("expected assignment, got {other:?}"),
        };

        // Both dispatched, none complete: the pool is starved, not done.
        assert!(matches!(
            coordinator.handle_task_request("w2").await,
            TaskDispatch::Starved
        ));

        coordinator
            .handle_task_result(first.task_id, "w1", b"one".to_vec())
            .await
            .unwrap();
        coordinator
            .handle_task_result(second.task_id, "w1", b"two".to_vec())
            .await
            .unwrap();

        assert!(coordinator.is_job_done().await);
        assert!(matches!(
            coordinator.handle_task_request("w2").await,
            TaskDispatch::Exhausted
        ));
        assert_eq!(coordinator.status().await.job_status, JobStatus::Done);
    }

    #[tokio::test]
    async fn request_after_done_is_exhausted_not_an_error() {
        let coordinator = make_coordinator(1).await;
        let task = match coordinator.handle_task_request("w1").await {
            TaskDispatch::Assigned(task) => task,
            other => panic!("expected assignment, got {other:?}"),
        };
        coordinator
            .handle_task_result(task.task_id, "w1", vec![])
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(matches!(
                coordinator.handle_task_request("w1").await,
                TaskDispatch::Exhausted
            ));
        }
    }

    #[tokio::test]
    async fn sweep_reclaims_expired_workers_tasks() {
        let coordinator = make_coordinator(1).await;
        coordinator.handle_job_request("w1").await;
        let task = match coordinator.handle_task_request("w1").await {
            TaskDispatch::Assigned(task) => task,
            other => panic!("expected assignment, got {other:?}"),
        };

        std::thread::sleep(Duration::from_millis(30));
        let reclaimed = coordinator.sweep(Duration::from_millis(10)).await;
        assert_eq!(reclaimed, 1);

        // The reclaimed task goes to the next worker; the stale result
        // from w1 is rejected.
        let retry = match coordinator.handle_task_request("w2").await {
            TaskDispatch::Assigned(task) => task,
            other => panic!("expected assignment, got {other:?}"),
        };
        assert_eq!(retry.task_id, task.task_id);

        let err = coordinator
            .handle_task_result(task.task_id, "w1", b"stale".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        coordinator
            .handle_task_result(retry.task_id, "w2", b"fresh".to_vec())
            .await
            .unwrap();
        assert!(coordinator.is_job_done().await);
        assert_eq!(coordinator.completed_tasks().await[0].result, b"fresh");
    }

    #[tokio::test]
    async fn hooks_fire_before_responses() {
        struct Counting {
            jobs: AtomicUsize,
            tasks: AtomicUsize,
        }
        impl CoordinatorHooks for Counting {
            fn on_job_request(&self, _: &str) {
                self.jobs.fetch_add(1, Ordering::SeqCst);
            }
            fn on_task_request(&self, _: &str) {
                self.tasks.fetch_add(1, Ordering::SeqCst);
            }
        }

        let hooks = Arc::new(Counting {
            jobs: AtomicUsize::new(0),
            tasks: AtomicUsize::new(0),
        });
        let coordinator = make_coordinator(1).await.with_hooks(hooks.clone());

        coordinator.handle_job_request("w1").await;
        coordinator.handle_task_request("w1").await;
        coordinator.handle_task_request("w1").await;

        assert_eq!(hooks.jobs.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.tasks.load(Ordering::SeqCst), 2);
    }
}
