//! Hive integration test harness.
//!
//! These tests drive the coordination core end-to-end, in process:
//! coordinator, connection registry, task ledger, and file store working
//! together the way the daemon wires them up. No network or subprocesses
//! are involved, so timing-sensitive tests use real (short) sleeps with
//! generous margins.

use hive_core::task::{Job, JobStatus, Task};
use hive_services::Coordinator;

mod coordination;
mod recovery;

// ── Harness ──────────────────────────────────────────────────────────────────

pub fn make_task(task_id: u64) -> Task {
    Task {
        task_id,
        program: "./work.sh".into(),
        args: vec![
            format!("payload_{task_id}.txt"),
            format!("output_{task_id}.txt"),
        ],
        payload: format!("payload-{task_id}").into_bytes(),
        output_file_name: format!("output_{task_id}.txt"),
        input_file_name: format!("payload_{task_id}.txt"),
    }
}

pub fn make_job(job_id: u64, job_path: std::path::PathBuf) -> Job {
    Job {
        job_id,
        job_path,
        file_names: vec![],
        status: JobStatus::Pending,
    }
}

/// A coordinator over `n` tasks with the default retry ceiling.
pub async fn make_coordinator(n: u64) -> Coordinator {
    Coordinator::new(
        make_job(1, std::env::temp_dir()),
        (1..=n).map(make_task).collect(),
        3,
    )
    .await
    .expect("unique task ids")
}
