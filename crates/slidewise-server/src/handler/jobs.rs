//! Job upload, run, polling, download and deletion handlers.

use std::path::Path as FilePath;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use slidewise_core::export::{self, ExportFormat};
use slidewise_core::types::Tool;
use slidewise_nats::JobStorage;

use crate::extract::{Json, Multipart, Path, Query};
use crate::handler::request::{JobPathParams, ResultQuery, RunJob};
use crate::handler::response::{JobCreated, JobDebug, JobResult, JobStatusResponse, JobView};
use crate::handler::{ErrorKind, Result};
use crate::pipeline::JobOrchestrator;
use crate::service::ServiceState;

/// Tracing target for job operations.
const TRACING_TARGET: &str = "slidewise_server::handler::jobs";

/// Multipart field holding the deck file.
const DECK_FIELD: &str = "deck";

/// Multipart field selecting the review tool.
const TOOL_FIELD: &str = "tool";

/// An uploaded deck before validation.
struct Upload {
    filename: String,
    bytes: bytes::Bytes,
}

fn parse_tool(value: &str) -> Result<Tool> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(Tool::default());
    }

    value.to_ascii_lowercase().parse().map_err(|_| {
        ErrorKind::BadRequest
            .with_message("Unknown review tool")
            .with_context(format!("Expected 'wr' or 'sr', got '{value}'"))
            .with_resource(TOOL_FIELD)
    })
}

/// Checks the upload and returns its base file name and text.
fn validate_upload(upload: Upload, extensions: &[&str]) -> Result<(String, String)> {
    let filename = FilePath::new(upload.filename.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_owned();

    if filename.is_empty() {
        return Err(ErrorKind::BadRequest
            .with_message("Uploaded deck has no file name")
            .with_resource(DECK_FIELD));
    }

    let extension = FilePath::new(&filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if !extensions.contains(&extension.as_str()) {
        return Err(ErrorKind::BadRequest
            .with_message("Unsupported deck format")
            .with_context(format!("Expected one of: .{}", extensions.join(", .")))
            .with_resource(DECK_FIELD));
    }

    if upload.bytes.is_empty() {
        return Err(ErrorKind::BadRequest
            .with_message("Uploaded deck is empty")
            .with_resource(DECK_FIELD));
    }

    let source = String::from_utf8(upload.bytes.to_vec()).map_err(|_| {
        ErrorKind::BadRequest
            .with_message("Uploaded deck is not valid UTF-8")
            .with_resource(DECK_FIELD)
    })?;

    Ok((filename, source))
}

/// Stores an uploaded deck as a new job awaiting its run.
#[tracing::instrument(skip_all)]
async fn create_job(
    State(orchestrator): State<JobOrchestrator>,
    Multipart(mut multipart): Multipart,
) -> Result<(StatusCode, Json<JobCreated>)> {
    let mut upload = None;
    let mut tool = Tool::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some(DECK_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field.bytes().await?;
                upload = Some(Upload { filename, bytes });
            }
            Some(TOOL_FIELD) => {
                tool = parse_tool(&field.text().await?)?;
            }
            name => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    field = name.unwrap_or_default(),
                    "Ignoring unknown multipart field"
                );
            }
        }
    }

    let upload = upload.ok_or_else(|| {
        ErrorKind::BadRequest
            .with_message("Missing deck file")
            .with_context("Send the deck as the 'deck' multipart field")
            .with_resource(DECK_FIELD)
    })?;

    let (filename, source) = validate_upload(upload, orchestrator.extractor().extensions())?;
    let job = orchestrator.create_job(tool, &filename, &source).await?;

    tracing::info!(
        target: TRACING_TARGET,
        job_id = %job.job_id,
        tool = %tool,
        "Deck uploaded"
    );

    Ok((StatusCode::CREATED, Json(job.into())))
}

/// Starts the background run of an uploaded job.
#[tracing::instrument(skip_all, fields(job_id = %path_params.job_id))]
async fn run_job(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<JobPathParams>,
    request: Option<Json<RunJob>>,
) -> Result<(StatusCode, Json<JobView>)> {
    let Json(request) = request.unwrap_or_default();

    let job = orchestrator
        .start_run(
            path_params.job_id,
            request.chunk_mode(),
            request.model.as_deref(),
        )
        .await?;

    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// Returns the job with its chunk states, refreshing progress first.
#[tracing::instrument(skip_all, fields(job_id = %path_params.job_id))]
async fn get_job(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<JobPathParams>,
) -> Result<(StatusCode, Json<JobStatusResponse>)> {
    let snapshot = orchestrator.snapshot(path_params.job_id).await?;

    let response = JobStatusResponse {
        job: snapshot.job.into(),
        chunks: snapshot.chunks,
    };

    Ok((StatusCode::OK, Json(response)))
}

/// Returns the merged rows as JSON or as a file download.
///
/// Rows are returned as they stand, so a job that is still running yields
/// the rows merged so far.
#[tracing::instrument(skip_all, fields(job_id = %path_params.job_id, format = %query.format))]
async fn get_result(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<JobPathParams>,
    Query(query): Query<ResultQuery>,
) -> Result<Response> {
    let snapshot = orchestrator.snapshot(path_params.job_id).await?;
    let job = snapshot.job;

    let body = match query.format {
        ExportFormat::Json => {
            let response = JobResult {
                rows: job.result_rows.into(),
                no_edits: job.no_edits,
                raw_chunks: query.include_raw.then_some(snapshot.chunks),
            };
            return Ok((StatusCode::OK, Json(response)).into_response());
        }
        ExportFormat::Csv => export::to_csv(&job.result_rows),
        ExportFormat::Xlsx => export::to_spreadsheet(&job.result_rows),
    };

    let file_name = export::file_name(job.tool, job.job_id, query.format);
    tracing::debug!(
        target: TRACING_TARGET,
        file_name = %file_name,
        size = body.len(),
        "Result exported"
    );

    let headers = [
        (CONTENT_TYPE, query.format.content_type().to_owned()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{file_name}\""),
        ),
    ];

    Ok((StatusCode::OK, headers, body).into_response())
}

/// Returns the stored job record with chunk descriptors and chunk states.
#[tracing::instrument(skip_all, fields(job_id = %path_params.job_id))]
async fn debug_job(
    State(storage): State<JobStorage>,
    Path(path_params): Path<JobPathParams>,
) -> Result<(StatusCode, Json<JobDebug>)> {
    let job = storage.get_job(path_params.job_id).await?.ok_or_else(|| {
        ErrorKind::NotFound
            .with_message("Job not found")
            .with_resource("job")
    })?;
    let chunks = storage.get_chunk_results(path_params.job_id).await?;

    Ok((StatusCode::OK, Json(JobDebug { job, chunks })))
}

/// Cancels the job's running chunks and deletes its records.
#[tracing::instrument(skip_all, fields(job_id = %path_params.job_id))]
async fn delete_job(
    State(orchestrator): State<JobOrchestrator>,
    Path(path_params): Path<JobPathParams>,
) -> Result<StatusCode> {
    if !orchestrator.cleanup_job(path_params.job_id).await? {
        return Err(ErrorKind::NotFound
            .with_message("Job not found")
            .with_resource("job"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/jobs", post(create_job))
        .route("/jobs/{job_id}", get(get_job).delete(delete_job))
        .route("/jobs/{job_id}/run", post(run_job))
        .route("/jobs/{job_id}/result", get(get_result))
        .route("/jobs/{job_id}/debug", get(debug_job))
}
