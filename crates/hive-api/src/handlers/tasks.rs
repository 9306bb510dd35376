//! /task and /taskData — the task loop.
//!
//! Dispatch replies are envelope-framed so the worker can route on the
//! message kind without further context: TaskData carries an assignment,
//! TaskSync means "starved, retry later", JobEnd means the job is done.
//! A malformed result envelope is rejected and logged; the connection is
//! kept.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use hive_core::envelope::{Envelope, MessageKind};
use hive_services::{LedgerError, TaskDispatch};

use super::{connection_id, ApiState};

#[derive(Serialize, Debug)]
pub struct TaskAck {
    pub task_id: u64,
    pub status: &'static str,
}

fn envelope_response(envelope: Envelope) -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        envelope.to_bytes(),
    )
        .into_response()
}

fn encode_or_500(
    kind: MessageKind,
    job_id: u64,
    data: Option<&[u8]>,
) -> Result<Envelope, (StatusCode, String)> {
    Envelope::encode(kind, job_id, data).map_err(|e| {
        tracing::error!(error = %e, "failed to encode reply envelope");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

/// Next-task request.
pub async fn handle_task(
    State(state): State<ApiState>,
    Path(job_id): Path<u64>,
    headers: HeaderMap,
) -> Result<Response, (StatusCode, String)> {
    let connection_id = connection_id(&headers)?;
    if job_id != state.job_id {
        return Err((StatusCode::NOT_FOUND, format!("unknown job: {job_id}")));
    }

    let envelope = match state.coordinator.handle_task_request(&connection_id).await {
        TaskDispatch::Assigned(task) => {
            let payload = serde_json::to_vec(&task)
                .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            encode_or_500(MessageKind::TaskData, job_id, Some(&payload))?
        }
        TaskDispatch::Starved => encode_or_500(MessageKind::TaskSync, job_id, None)?,
        TaskDispatch::Exhausted => encode_or_500(MessageKind::JobEnd, job_id, None)?,
    };

    Ok(envelope_response(envelope))
}

/// Result submission. The body is a TaskData envelope whose payload is the
/// raw result bytes.
pub async fn handle_task_data(
    State(state): State<ApiState>,
    Path((job_id, task_id)): Path<(u64, u64)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TaskAck>, (StatusCode, String)> {
    let connection_id = connection_id(&headers)?;

    let envelope = Envelope::decode(&body).map_err(|e| {
        tracing::warn!(connection_id, task_id, error = %e, "rejecting malformed result envelope");
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    if envelope.job_id != job_id {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("envelope job id {} does not match route", envelope.job_id),
        ));
    }
    if envelope.kind != MessageKind::TaskData {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("unexpected message kind {:?}", envelope.kind),
        ));
    }

    let result = envelope
        .data()
        .map_err(|e| {
            tracing::warn!(
                connection_id,
                task_id,
                id = hex::encode(envelope.id),
                error = %e,
                "discarding undecodable result payload"
            );
            (StatusCode::BAD_REQUEST, e.to_string())
        })?
        .unwrap_or_default();

    match state
        .coordinator
        .handle_task_result(task_id, &connection_id, result)
        .await
    {
        Ok(()) => Ok(Json(TaskAck {
            task_id,
            status: "ok",
        })),
        Err(err @ LedgerError::UnknownTask(_)) => Err((StatusCode::NOT_FOUND, err.to_string())),
        Err(err @ LedgerError::InvalidTransition { .. }) => {
            tracing::warn!(connection_id, task_id, error = %err, "stale or duplicate result rejected");
            Err((StatusCode::CONFLICT, err.to_string()))
        }
        Err(err) => Err((StatusCode::INTERNAL_SERVER_ERROR, err.to_string())),
    }
}
