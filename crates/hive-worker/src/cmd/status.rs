//! Status and discovery commands.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    job_id: u64,
    job_status: String,
    tasks: TaskCounts,
    workers: Vec<WorkerInfo>,
}

#[derive(Deserialize)]
struct TaskCounts {
    unassigned: usize,
    in_flight: usize,
    complete: usize,
    failed: usize,
}

#[derive(Deserialize)]
struct WorkerInfo {
    connection_id: String,
    state: String,
    idle_secs: u64,
}

#[derive(Deserialize)]
struct MasterInfo {
    addr: String,
}

// ── Commands ─────────────────────────────────────────────────────────────────

pub async fn status(master: &str) -> Result<()> {
    let resp: StatusResponse =
        get_json(&format!("{}/status", base_url(master)), "hive-worker-ctl").await?;

    println!("═══════════════════════════════════════");
    println!("  Hive Master Status — job {}", resp.job_id);
    println!("═══════════════════════════════════════");
    println!("  Job status : {}", resp.job_status);
    println!("  Unassigned : {}", resp.tasks.unassigned);
    println!("  In flight  : {}", resp.tasks.in_flight);
    println!("  Complete   : {}", resp.tasks.complete);
    println!("  Failed     : {}", resp.tasks.failed);

    if resp.workers.is_empty() {
        println!("\n  No workers seen yet.");
    } else {
        println!("\n  Workers:");
        for w in &resp.workers {
            println!("  ┌─ {}", w.connection_id);
            println!("  │  state : {}", w.state);
            println!("  └─ idle  : {}s", w.idle_secs);
        }
    }

    Ok(())
}

pub async fn discover(master: &str) -> Result<()> {
    let resp: MasterInfo =
        get_json(&format!("{}/discovery", base_url(master)), "hive-worker-ctl").await?;
    println!("{}", resp.addr);
    Ok(())
}
