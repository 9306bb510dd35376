//! HTTP handlers — the thin transport skin over the coordinator.

pub mod files;
pub mod jobs;
pub mod status;
pub mod tasks;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};

use hive_services::Coordinator;

#[derive(Clone)]
pub struct ApiState {
    pub coordinator: Arc<Coordinator>,
    /// Id of the job this master is serving.
    pub job_id: u64,
    /// Externally reachable address, returned by /discovery.
    pub master_addr: String,
}

// ── Shared helpers ───────────────────────────────────────────────────────────

/// Extract the worker's connection id: `x-connection-id` header first,
/// then an `id` cookie. The value is an arbitrary untrusted string.
fn connection_id(headers: &HeaderMap) -> Result<String, (StatusCode, String)> {
    if let Some(value) = headers.get("x-connection-id") {
        if let Ok(id) = value.to_str() {
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
    }

    if let Some(cookies) = headers.get(axum::http::header::COOKIE) {
        if let Ok(cookies) = cookies.to_str() {
            for pair in cookies.split(';') {
                if let Some(id) = pair.trim().strip_prefix("id=") {
                    if !id.is_empty() {
                        return Ok(id.to_string());
                    }
                }
            }
        }
    }

    Err((
        StatusCode::BAD_REQUEST,
        "missing connection id (x-connection-id header or id cookie)".to_string(),
    ))
}

// Re-export handler functions for use in router setup.
pub use files::handle_file;
pub use jobs::handle_job;
pub use status::{handle_discovery, handle_heartbeat, handle_status};
pub use tasks::{handle_task, handle_task_data};
