//! Run API Handlers
//!
//! HTTP endpoints for run inspection and remote result submission.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pipewatch_core::domain::job::SubmitRun;
use pipewatch_core::domain::log::LogEntry;
use pipewatch_core::dto::run::RunView;

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::run_service;

// =============================================================================
// Run Endpoints
// =============================================================================

/// GET /job/{name}/runs
/// List all runs of a job, newest first
pub async fn list_runs(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<Vec<RunView>>> {
    tracing::debug!("Listing runs for job: {}", name);

    let runs = run_service::list_runs(&state.jobs, &name)?;

    Ok(Json(runs))
}

/// GET /job/{name}/run/{number}
/// Get a run with its progress
pub async fn get_run(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, u64)>,
) -> ApiResult<Json<RunView>> {
    tracing::debug!("Getting run {} #{}", name, number);

    let run = run_service::get_run(&state.jobs, &name, number)?;

    Ok(Json(run))
}

/// DELETE /job/{name}/run/{number}
/// Delete a run
pub async fn delete_run(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, u64)>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting run {} #{}", name, number);

    run_service::delete_run(&state.jobs, &name, number).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /job/{name}/commit/{sha}
/// Get the run a commit currently maps to
pub async fn get_run_for_commit(
    State(state): State<AppState>,
    Path((name, sha)): Path<(String, String)>,
) -> ApiResult<Json<RunView>> {
    tracing::debug!("Getting run of job {} for commit {}", name, sha);

    let run = run_service::get_run_for_commit(&state.jobs, &name, &sha)?;

    Ok(Json(run))
}

/// POST /job/{name}/submit
/// Record a finished run posted by a remote monitor
pub async fn submit_run(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SubmitRun>,
) -> ApiResult<(StatusCode, Json<RunView>)> {
    tracing::info!("Submitting {} result for job: {}", req.result, name);

    let run = run_service::submit_run(&state.jobs, &name, req).await?;

    Ok((StatusCode::CREATED, Json(run)))
}

// =============================================================================
// Log Endpoints
// =============================================================================

/// GET /job/{name}/run/{number}/logs
/// Get all log entries of a run
pub async fn get_run_logs(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, u64)>,
) -> ApiResult<Json<Vec<LogEntry>>> {
    tracing::debug!("Getting logs for run {} #{}", name, number);

    let logs = run_service::get_run_logs(&state.jobs, &name, number)?;

    Ok(Json(logs))
}
