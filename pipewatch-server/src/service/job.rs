//! Job Service
//!
//! Business logic for job management.

use chrono::Utc;
use pipewatch_core::directory::JobDirectory;
use pipewatch_core::domain::job::{Job, JobDefinition, validate_name};
use pipewatch_core::dto::job::{CreateJob, JobDetails, JobSummary};
use pipewatch_core::store::{JobCatalog, StoreError};
use std::sync::Arc;

/// Runs included in job details
pub const RECENT_RUNS: usize = 10;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(String),
    AlreadyExists(String),
    ValidationError(String),
    StoreError(StoreError),
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        JobError::StoreError(err)
    }
}

/// Create a new job
///
/// The name is reserved in the directory before the definition is stored,
/// and released again if storing fails.
pub async fn create_job(
    jobs: &JobDirectory,
    catalog: &dyn JobCatalog,
    req: CreateJob,
    default_max_runs: Option<u32>,
) -> Result<Arc<Job>, JobError> {
    validate_name(&req.name).map_err(JobError::ValidationError)?;

    let definition = JobDefinition {
        name: req.name,
        kind: req.kind,
        display_name: req.display_name,
        max_runs: req.max_runs.or(default_max_runs),
        created_at: Utc::now(),
    };

    let Some(job) = jobs.insert(definition.clone()) else {
        return Err(JobError::AlreadyExists(definition.name));
    };

    if let Err(err) = catalog.create_job(&definition).await {
        jobs.remove(&definition.name);
        return Err(err.into());
    }

    tracing::info!("Job created: {} ({})", job.name(), job.kind());

    Ok(job)
}

/// Get a job by name
pub fn get_job(jobs: &JobDirectory, name: &str) -> Result<Arc<Job>, JobError> {
    jobs.get(name)
        .ok_or_else(|| JobError::NotFound(name.to_string()))
}

/// Get a job with its estimate and most recent runs
pub fn get_job_details(jobs: &JobDirectory, name: &str) -> Result<JobDetails, JobError> {
    let job = get_job(jobs, name)?;
    Ok(JobDetails::build(&job, RECENT_RUNS, Utc::now()))
}

/// List all jobs
pub fn list_jobs(jobs: &JobDirectory) -> Vec<JobSummary> {
    jobs.list()
        .iter()
        .map(|job| JobSummary::from(job.as_ref()))
        .collect()
}

/// Delete a job and all its runs
pub async fn delete_job(
    jobs: &JobDirectory,
    catalog: &dyn JobCatalog,
    name: &str,
) -> Result<(), JobError> {
    let stored = catalog.delete_job(name).await?;
    let removed = jobs.remove(name).is_some();

    if !removed && !stored {
        return Err(JobError::NotFound(name.to_string()));
    }

    tracing::info!("Job {} deleted", name);

    Ok(())
}
