//! hived — the Hive master daemon.
//!
//! Loads the jobfile, builds the coordinator, and serves the worker-facing
//! HTTP surface. Two background loops run alongside the server: the
//! liveness sweeper (expires silent workers and reclaims their tasks) and
//! a progress watcher that logs task counts until the job completes.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use hive_api::ApiState;
use hive_core::config::HiveConfig;
use hive_services::{jobfile, Coordinator};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = HiveConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = HiveConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        HiveConfig::default()
    });

    // Jobfile path: first CLI argument overrides the configured one.
    let jobfile_path = std::env::args()
        .nth(1)
        .map(Into::into)
        .unwrap_or_else(|| config.job.jobfile.clone());

    let (job, tasks) = jobfile::load(&jobfile_path)
        .with_context(|| format!("loading jobfile {}", jobfile_path.display()))?;
    tracing::info!(
        job_id = job.job_id,
        tasks = tasks.len(),
        files = job.file_names.len(),
        path = %jobfile_path.display(),
        "job loaded"
    );

    let job_id = job.job_id;
    let coordinator = Arc::new(
        Coordinator::new(job, tasks, config.job.max_task_retries)
            .await
            .context("seeding the task ledger")?,
    );

    let master_addr = format!(
        "{}:{}",
        local_addr().unwrap_or_else(|| config.network.host.parse().unwrap_or([127, 0, 0, 1].into())),
        config.network.port
    );
    tracing::info!(addr = %master_addr, "master address for discovery");

    // Liveness sweeper — recurring, independent of request handling, so a
    // job with no active requests still reclaims stale tasks.
    {
        let coordinator = coordinator.clone();
        let timeout = Duration::from_secs(config.liveness.timeout_secs);
        let interval = Duration::from_secs(config.liveness.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                coordinator.sweep(timeout).await;
            }
        });
    }

    // Progress watcher.
    {
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(10));
            let mut announced = false;
            loop {
                ticker.tick().await;
                let status = coordinator.status().await;
                tracing::info!(
                    unassigned = status.tasks.unassigned,
                    in_flight = status.tasks.in_flight,
                    complete = status.tasks.complete,
                    failed = status.tasks.failed,
                    workers = status.connections.len(),
                    "job progress"
                );
                if !announced && coordinator.is_job_done().await {
                    announced = true;
                    let completed = coordinator.completed_tasks().await;
                    tracing::info!(
                        completed = completed.len(),
                        failed = status.tasks.failed,
                        "all tasks accounted for — results ready for reassembly"
                    );
                }
            }
        });
    }

    let state = ApiState {
        coordinator,
        job_id,
        master_addr,
    };
    hive_api::serve(state, &config.network.host, config.network.port).await
}

/// Best-effort local address for discovery: connect a throwaway UDP socket
/// and read back the chosen source address. No packets are sent.
fn local_addr() -> Option<IpAddr> {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0").ok()?;
    probe.connect("8.8.8.8:80").ok()?;
    probe.local_addr().ok().map(|addr| addr.ip())
}
