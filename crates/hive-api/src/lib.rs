pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// Build the master's route table.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/discovery", get(handlers::handle_discovery))
        .route("/job", get(handlers::handle_job))
        .route("/file/{job_id}/{file_name}", get(handlers::handle_file))
        .route("/task/{job_id}", get(handlers::handle_task))
        .route(
            "/taskData/{job_id}/{task_id}",
            post(handlers::handle_task_data).layer(DefaultBodyLimit::max(64 * 1024 * 1024)),
        )
        .route("/heartbeat", get(handlers::handle_heartbeat))
        .route("/status", get(handlers::handle_status))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(state: ApiState, host: &str, port: u16) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(format!("{host}:{port}")).await?;
    tracing::info!(host, port, "master API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
