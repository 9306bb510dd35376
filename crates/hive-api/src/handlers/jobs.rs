//! /job — the job handshake.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;

use hive_services::JobDescriptor;

use super::{connection_id, ApiState};

/// Job metadata request. Registers (or refreshes) the connection as a side
/// effect, then returns the job description. Safe to repeat.
pub async fn handle_job(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> Result<Json<JobDescriptor>, (StatusCode, String)> {
    let connection_id = connection_id(&headers)?;
    tracing::debug!(connection_id, "job request");
    Ok(Json(state.coordinator.handle_job_request(&connection_id).await))
}
