//! Job and task model — the unit of work the master hands out and the
//! container it belongs to.
//!
//! `Task` is also the JSON payload of a TaskData assignment envelope; the
//! master never interprets `program` or `args`, it only ships them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not yet handed to any worker. The only dispatchable state.
    Unassigned,
    /// Handed to a worker, result pending.
    InFlight,
    /// Result received and stored.
    Complete,
    /// Retry ceiling exceeded — permanently failed.
    Failed,
}

/// One unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique within a job.
    pub task_id: u64,
    /// Program the worker invokes. Opaque to the master.
    pub program: String,
    /// Arguments for the program. Opaque to the master.
    pub args: Vec<String>,
    /// Inline input bytes, written to `input_file_name` before the run.
    #[serde(default)]
    pub payload: Vec<u8>,
    /// Name of the artifact the program produces.
    pub output_file_name: String,
    /// Name the inline payload is written under.
    pub input_file_name: String,
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Loaded, no worker has asked for it yet.
    Pending,
    /// At least one worker is engaged.
    Running,
    /// Every task is Complete or permanently Failed.
    Done,
}

/// Container for a task batch.
#[derive(Debug, Clone)]
pub struct Job {
    pub job_id: u64,
    /// Directory the job's input files are served from.
    pub job_path: PathBuf,
    /// Input files workers may fetch.
    pub file_names: Vec<String>,
    pub status: JobStatus,
}
