//! Job API Handlers
//!
//! HTTP endpoints for job management.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use pipewatch_core::dto::job::{CreateJob, JobDetails, JobSummary};

use crate::api::AppState;
use crate::api::error::ApiResult;
use crate::service::job_service;

/// POST /job/create
/// Create a new job
pub async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<JobSummary>)> {
    tracing::info!("Creating job: {}", req.name);

    let job = job_service::create_job(
        &state.jobs,
        state.catalog.as_ref(),
        req,
        state.default_max_runs,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(JobSummary::from(job.as_ref()))))
}

/// GET /job/list
/// List all jobs
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<JobSummary>>> {
    tracing::debug!("Listing all jobs");

    Ok(Json(job_service::list_jobs(&state.jobs)))
}

/// GET /job/{name}
/// Get job details by name
pub async fn get_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<JobDetails>> {
    tracing::debug!("Getting job: {}", name);

    let details = job_service::get_job_details(&state.jobs, &name)?;

    Ok(Json(details))
}

/// DELETE /job/{name}
/// Delete a job and all its runs
pub async fn delete_job(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting job: {}", name);

    job_service::delete_job(&state.jobs, state.catalog.as_ref(), &name).await?;

    Ok(StatusCode::NO_CONTENT)
}
