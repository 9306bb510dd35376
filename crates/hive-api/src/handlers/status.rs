//! /discovery, /heartbeat, /status — liveness and diagnostics.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;

use hive_core::task::JobStatus;
use hive_services::ConnectionState;

use super::{connection_id, ApiState};

// ── /discovery (GET) ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MasterInfo {
    pub addr: String,
}

/// Initial master discovery. Stateless and idempotent.
pub async fn handle_discovery(State(state): State<ApiState>) -> Json<MasterInfo> {
    Json(MasterInfo {
        addr: state.master_addr.clone(),
    })
}

// ── /heartbeat (GET) ─────────────────────────────────────────────────────────

/// Liveness signal from a worker.
pub async fn handle_heartbeat(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<StatusCode, (StatusCode, String)> {
    let connection_id = connection_id(&headers)?;
    state.coordinator.handle_heartbeat(&connection_id);
    Ok(StatusCode::OK)
}

// ── /status (GET) ────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct StatusResponse {
    pub job_id: u64,
    pub job_status: JobStatus,
    pub tasks: TaskCountsJson,
    pub workers: Vec<WorkerJson>,
}

#[derive(Serialize)]
pub struct TaskCountsJson {
    pub unassigned: usize,
    pub in_flight: usize,
    pub complete: usize,
    pub failed: usize,
}

#[derive(Serialize)]
pub struct WorkerJson {
    pub connection_id: String,
    pub state: &'static str,
    pub idle_secs: u64,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let status = state.coordinator.status().await;
    Json(StatusResponse {
        job_id: status.job_id,
        job_status: status.job_status,
        tasks: TaskCountsJson {
            unassigned: status.tasks.unassigned,
            in_flight: status.tasks.in_flight,
            complete: status.tasks.complete,
            failed: status.tasks.failed,
        },
        workers: status
            .connections
            .into_iter()
            .map(|c| WorkerJson {
                connection_id: c.connection_id,
                state: match c.state {
                    ConnectionState::Active => "active",
                    ConnectionState::Expired => "expired",
                },
                idle_secs: c.idle.as_secs(),
            })
            .collect(),
    })
}
