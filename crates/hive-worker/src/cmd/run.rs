//! The worker loop: join the job, fetch input files, then pull tasks and
//! return results until the master says the job is over.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use hive_core::envelope::{Envelope, MessageKind};
use hive_core::task::Task;

use super::http::{base_url, get_bytes, get_json, post_bytes};

/// How often the background heartbeat fires. Must be comfortably inside
/// the master's liveness timeout.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);

/// How long to wait before retrying when the master reports starvation.
const STARVED_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Deserialize)]
struct JobResponse {
    job_id: u64,
    file_names: Vec<String>,
    task_count: usize,
}

pub async fn run(master: &str, connection_id: &str, work_dir: PathBuf) -> Result<()> {
    let base = base_url(master);

    // Job handshake — registers this worker with the master.
    let job: JobResponse = get_json(&format!("{base}/job"), connection_id).await?;
    tracing::info!(
        job_id = job.job_id,
        tasks = job.task_count,
        files = job.file_names.len(),
        connection_id,
        "joined job"
    );

    tokio::fs::create_dir_all(&work_dir)
        .await
        .with_context(|| format!("creating work dir {}", work_dir.display()))?;

    // Input files, fetched once up front.
    for file_name in &job.file_names {
        let bytes = get_bytes(
            &format!("{base}/file/{}/{file_name}", job.job_id),
            connection_id,
        )
        .await?;
        let envelope = Envelope::decode(&bytes)
            .with_context(|| format!("decoding file envelope for {file_name}"))?;
        let data = envelope
            .data()
            .with_context(|| format!("decompressing {file_name}"))?
            .unwrap_or_default();
        tokio::fs::write(work_dir.join(file_name), data)
            .await
            .with_context(|| format!("writing {file_name}"))?;
        tracing::info!(file_name, "input file fetched");
    }

    // Background heartbeat for the duration of the task loop.
    let heartbeat = {
        let base = base.clone();
        let connection_id = connection_id.to_string();
        tokio::spawn(async move {
            let client = reqwest::Client::new();
            let mut ticker = tokio::time::interval(HEARTBEAT_INTERVAL);
            loop {
                ticker.tick().await;
                let sent = client
                    .get(format!("{base}/heartbeat"))
                    .header("x-connection-id", connection_id.clone())
                    .send()
                    .await;
                if let Err(e) = sent {
                    tracing::warn!(error = %e, "heartbeat failed");
                }
            }
        })
    };

    let outcome = task_loop(&base, connection_id, job.job_id, &work_dir).await;
    heartbeat.abort();
    outcome
}

async fn task_loop(base: &str, connection_id: &str, job_id: u64, work_dir: &Path) -> Result<()> {
    loop {
        let bytes = get_bytes(&format!("{base}/task/{job_id}"), connection_id).await?;
        let envelope = Envelope::decode(&bytes).context("decoding task envelope")?;

        match envelope.kind {
            MessageKind::TaskData => {
                let payload = envelope
                    .data()
                    .context("decompressing task assignment")?
                    .context("task assignment carried no payload")?;
                let task: Task =
                    serde_json::from_slice(&payload).context("parsing task assignment")?;
                let task_id = task.task_id;
                tracing::info!(task_id, program = %task.program, "task received");

                let result = execute(&task, work_dir).await?;
                let reply = Envelope::encode(MessageKind::TaskData, job_id, Some(&result))
                    .context("encoding result envelope")?;
                post_bytes(
                    &format!("{base}/taskData/{job_id}/{task_id}"),
                    connection_id,
                    reply.to_bytes(),
                )
                .await?;
                tracing::info!(task_id, bytes = result.len(), "result submitted");
            }
            MessageKind::TaskSync => {
                tracing::debug!("no task available, retrying");
                tokio::time::sleep(STARVED_BACKOFF).await;
            }
            MessageKind::JobEnd => {
                tracing::info!(job_id, "job complete, exiting task loop");
                return Ok(());
            }
            other => {
                tracing::warn!(kind = ?other, "unexpected message kind, ignoring");
            }
        }
    }
}

/// Run one task: write its inline payload to the input file, invoke the
/// program in the work dir, and collect the output artifact (falling back
/// to stdout when the program does not write one).
async fn execute(task: &Task, work_dir: &Path) -> Result<Vec<u8>> {
    tokio::fs::write(work_dir.join(&task.input_file_name), &task.payload)
        .await
        .with_context(|| format!("writing input {}", task.input_file_name))?;

    let output = tokio::process::Command::new(&task.program)
        .args(&task.args)
        .current_dir(work_dir)
        .output()
        .await
        .with_context(|| format!("failed to spawn '{}'", task.program))?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "task {} program '{}' exited with {code}: {stderr}",
            task.task_id,
            task.program
        );
    }

    let artifact = work_dir.join(&task.output_file_name);
    match tokio::fs::read(&artifact).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                task_id = task.task_id,
                output_file = %task.output_file_name,
                "no output artifact, using stdout"
            );
            Ok(output.stdout)
        }
        Err(e) => Err(e).with_context(|| format!("reading {}", artifact.display())),
    }
}
