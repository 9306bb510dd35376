//! Jobfile loading — turns the on-disk JSON job description into a `Job`
//! and its task batch.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hive_core::task::{Job, JobStatus, Task};

#[derive(Debug, thiserror::Error)]
pub enum JobfileError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, serde_json::Error),
}

/// On-disk shape of a jobfile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub job_id: u64,
    /// Directory input files are served from. Defaults to the jobfile's
    /// own directory.
    #[serde(default)]
    pub job_path: Option<PathBuf>,
    /// Input files workers may fetch.
    #[serde(default)]
    pub file_names: Vec<String>,
    pub tasks: Vec<TaskSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub task_id: u64,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Inline payload text, written to `input_file_name` on the worker.
    #[serde(default)]
    pub payload: String,
    pub output_file_name: String,
    pub input_file_name: String,
}

/// Load a jobfile and build the job plus its task batch.
pub fn load(path: &Path) -> Result<(Job, Vec<Task>), JobfileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| JobfileError::ReadFailed(path.to_path_buf(), e))?;
    let spec: JobSpec = serde_json::from_str(&text)
        .map_err(|e| JobfileError::ParseFailed(path.to_path_buf(), e))?;

    let job_path = spec.job_path.unwrap_or_else(|| {
        path.parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let job = Job {
        job_id: spec.job_id,
        job_path,
        file_names: spec.file_names,
        status: JobStatus::Pending,
    };

    let tasks = spec
        .tasks
        .into_iter()
        .map(|t| Task {
            task_id: t.task_id,
            program: t.program,
            args: t.args,
            payload: t.payload.into_bytes(),
            output_file_name: t.output_file_name,
            input_file_name: t.input_file_name,
        })
        .collect();

    Ok((job, tasks))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "job_id": 12,
        "file_names": ["test_file.txt"],
        "tasks": [
            {
                "task_id": 1,
                "program": "./work.sh",
                "args": ["payload_1.txt", "output_1.txt"],
                "payload": "hello",
                "output_file_name": "output_1.txt",
                "input_file_name": "payload_1.txt"
            },
            {
                "task_id": 2,
                "program": "./work.sh",
                "args": ["payload_2.txt", "output_2.txt"],
                "payload": "world",
                "output_file_name": "output_2.txt",
                "input_file_name": "payload_2.txt"
            }
        ]
    }"#;

    fn write_jobfile(tag: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hive-jobfile-test-{}-{tag}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("jobfile.json");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_parses_job_and_tasks() {
        let path = write_jobfile("parse", SAMPLE);
        let (job, tasks) = load(&path).unwrap();

        assert_eq!(job.job_id, 12);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.file_names, vec!["test_file.txt"]);
        // job_path defaults to the jobfile's directory.
        assert_eq!(job.job_path, path.parent().unwrap());

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_id, 1);
        assert_eq!(tasks[0].payload, b"hello");
        assert_eq!(tasks[1].payload, b"world");

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load(Path::new("/nonexistent/jobfile.json")).unwrap_err();
        assert!(matches!(err, JobfileError::ReadFailed(_, _)));
    }

    #[test]
    fn load_reports_malformed_json() {
        let path = write_jobfile("malformed", "{ not json");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, JobfileError::ParseFailed(_, _)));
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
