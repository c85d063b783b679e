//! Chunk retry and re-check handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use slidewise_core::types::ChunkState;

use crate::extract::{Json, Path};
use crate::handler::Result;
use crate::handler::request::ChunkPathParams;
use crate::pipeline::JobOrchestrator;
use crate::service::ServiceState;

/// Tracing target for chunk operations.
const TRACING_TARGET: &str = "slidewise_server::handler::chunks";

/// Runs a concluded chunk again.
#[tracing::instrument(
    skip_all,
    fields(job_id = %path_params.job_id, chunk_id = %path_params.chunk_id)
)]
async fn retry_chunk(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<ChunkPathParams>,
) -> Result<(StatusCode, Json<ChunkState>)> {
    let state = orchestrator
        .retry_chunk(path_params.job_id, &path_params.chunk_id)
        .await?;

    tracing::debug!(target: TRACING_TARGET, attempt = state.attempts, "Chunk retry accepted");
    Ok((StatusCode::ACCEPTED, Json(state)))
}

/// Asks the model to review a concluded chunk again.
#[tracing::instrument(
    skip_all,
    fields(job_id = %path_params.job_id, chunk_id = %path_params.chunk_id)
)]
async fn recheck_chunk(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<ChunkPathParams>,
) -> Result<(StatusCode, Json<ChunkState>)> {
    let state = orchestrator
        .recheck_chunk(path_params.job_id, &path_params.chunk_id)
        .await?;

    tracing::debug!(target: TRACING_TARGET, attempt = state.attempts, "Chunk re-check accepted");
    Ok((StatusCode::ACCEPTED, Json(state)))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/jobs/{job_id}/chunks/{chunk_id}/retry", post(retry_chunk))
        .route("/jobs/{job_id}/chunks/{chunk_id}/recheck", post(recheck_chunk))
}
