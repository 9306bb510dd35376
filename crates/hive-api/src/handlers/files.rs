//! /file — input file exchange.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use hive_services::FileError;

use super::ApiState;

/// Serve a job input file as a FileData envelope, octet-stream.
pub async fn handle_file(
    State(state): State<ApiState>,
    Path((job_id, file_name)): Path<(u64, String)>,
) -> Result<Response, (StatusCode, String)> {
    match state.coordinator.handle_file_request(job_id, &file_name) {
        Ok(bytes) => Ok((
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes,
        )
            .into_response()),
        Err(FileError::NotFound(name)) => {
            Err((StatusCode::NOT_FOUND, format!("no such file: {name}")))
        }
        Err(err) => {
            tracing::error!(file_name, error = %err, "file request failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
    }
}
