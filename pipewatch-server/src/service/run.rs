//! Run Service
//!
//! Business logic for run inspection, deletion and remote submission.

use chrono::Utc;
use pipewatch_core::directory::JobDirectory;
use pipewatch_core::domain::job::{Job, JobKind, SubmitRun};
use pipewatch_core::domain::log::LogEntry;
use pipewatch_core::domain::run::RunRecord;
use pipewatch_core::dto::run::RunView;
use pipewatch_core::store::StoreError;
use std::sync::Arc;

/// Service error type
#[derive(Debug)]
pub enum RunError {
    JobNotFound(String),
    RunNotFound { job: String, number: u64 },
    CommitNotFound { job: String, sha: String },
    ValidationError(String),
    StoreError(StoreError),
}

impl From<StoreError> for RunError {
    fn from(err: StoreError) -> Self {
        RunError::StoreError(err)
    }
}

/// List all runs of a job, newest first
pub fn list_runs(jobs: &JobDirectory, job_name: &str) -> Result<Vec<RunView>, RunError> {
    let job = find_job(jobs, job_name)?;
    let estimate = job.estimated_duration();
    let now = Utc::now();

    Ok(job
        .registry()
        .runs()
        .iter()
        .map(|run| RunView::with_estimate(run, estimate, now))
        .collect())
}

/// Get a run by job and number
pub fn get_run(jobs: &JobDirectory, job_name: &str, number: u64) -> Result<RunView, RunError> {
    let job = find_job(jobs, job_name)?;
    let run = find_run(&job, number)?;
    Ok(RunView::build(&job, &run, Utc::now()))
}

/// Get the log of a run
pub fn get_run_logs(
    jobs: &JobDirectory,
    job_name: &str,
    number: u64,
) -> Result<Vec<LogEntry>, RunError> {
    let job = find_job(jobs, job_name)?;
    let run = find_run(&job, number)?;
    Ok(run.log())
}

/// Get the run a commit currently maps to
pub fn get_run_for_commit(
    jobs: &JobDirectory,
    job_name: &str,
    sha: &str,
) -> Result<RunView, RunError> {
    let job = find_job(jobs, job_name)?;
    let run = job
        .registry()
        .for_commit(sha)
        .ok_or_else(|| RunError::CommitNotFound {
            job: job_name.to_string(),
            sha: sha.to_string(),
        })?;
    Ok(RunView::build(&job, &run, Utc::now()))
}

/// Delete a run
pub async fn delete_run(jobs: &JobDirectory, job_name: &str, number: u64) -> Result<(), RunError> {
    let job = find_job(jobs, job_name)?;

    if !job.delete_run(number).await? {
        return Err(RunError::RunNotFound {
            job: job_name.to_string(),
            number,
        });
    }

    Ok(())
}

/// Record a finished run posted by a remote monitor
pub async fn submit_run(
    jobs: &JobDirectory,
    job_name: &str,
    req: SubmitRun,
) -> Result<RunView, RunError> {
    let job = find_job(jobs, job_name)?;

    if job.kind() != JobKind::ExternalMonitor {
        return Err(RunError::ValidationError(format!(
            "Job {} is a {} job and does not accept submitted results",
            job_name,
            job.kind()
        )));
    }

    let (run, transition) = job
        .submit(&req)
        .await
        .map_err(RunError::ValidationError)?;
    tracing::info!(
        "Run {} #{} submitted: {:?}",
        job_name,
        run.number(),
        transition
    );

    Ok(RunView::build(&job, &run, Utc::now()))
}

// =============================================================================
// Lookup Helpers
// =============================================================================

fn find_job(jobs: &JobDirectory, name: &str) -> Result<Arc<Job>, RunError> {
    jobs.get(name)
        .ok_or_else(|| RunError::JobNotFound(name.to_string()))
}

fn find_run(job: &Job, number: u64) -> Result<Arc<RunRecord>, RunError> {
    job.registry()
        .get(number)
        .ok_or_else(|| RunError::RunNotFound {
            job: job.name().to_string(),
            number,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipewatch_core::domain::job::JobDefinition;
    use pipewatch_core::domain::status::RunResult;
    use pipewatch_core::store::MemoryStore;

    fn setup(kind: JobKind) -> (Arc<MemoryStore>, JobDirectory) {
        let store = Arc::new(MemoryStore::new());
        let jobs = JobDirectory::new(store.clone());
        jobs.insert(JobDefinition {
            name: "demo".to_string(),
            kind,
            display_name: None,
            max_runs: None,
            created_at: Utc::now(),
        });
        (store, jobs)
    }

    #[tokio::test]
    async fn test_submit_run_to_monitor_job() {
        let (store, jobs) = setup(JobKind::ExternalMonitor);

        let view = submit_run(
            &jobs,
            "demo",
            SubmitRun {
                result: RunResult::Failure,
                duration_ms: 2_500,
                log: vec!["step 1".to_string()],
            },
        )
        .await
        .unwrap();

        assert_eq!(view.run.number, 1);
        assert_eq!(view.run.result, Some(RunResult::Failure));
        assert_eq!(view.run.duration_ms, 2_500);
        assert_eq!(store.save_count(), 1);
        assert_eq!(get_run_logs(&jobs, "demo", 1).unwrap()[0].message, "step 1");
    }

    #[tokio::test]
    async fn test_submit_run_to_pipeline_job_is_rejected() {
        let (_, jobs) = setup(JobKind::Pipeline);

        let result = submit_run(
            &jobs,
            "demo",
            SubmitRun {
                result: RunResult::Success,
                duration_ms: 1,
                log: Vec::new(),
            },
        )
        .await;

        assert!(matches!(result, Err(RunError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_submit_run_with_huge_duration_is_rejected() {
        let (store, jobs) = setup(JobKind::ExternalMonitor);

        let result = submit_run(
            &jobs,
            "demo",
            SubmitRun {
                result: RunResult::Success,
                duration_ms: i64::MAX / 2,
                log: Vec::new(),
            },
        )
        .await;

        assert!(matches!(result, Err(RunError::ValidationError(_))));
        assert!(list_runs(&jobs, "demo").unwrap().is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_lookup_errors() {
        let (_, jobs) = setup(JobKind::Pipeline);

        assert!(matches!(
            get_run(&jobs, "missing", 1),
            Err(RunError::JobNotFound(_))
        ));
        assert!(matches!(
            get_run(&jobs, "demo", 1),
            Err(RunError::RunNotFound { number: 1, .. })
        ));
        assert!(matches!(
            get_run_for_commit(&jobs, "demo", "abc"),
            Err(RunError::CommitNotFound { .. })
        ));
        assert!(matches!(
            delete_run(&jobs, "demo", 1).await,
            Err(RunError::RunNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_lookup_and_listing() {
        let (_, jobs) = setup(JobKind::Pipeline);
        let job = jobs.get("demo").unwrap();
        let (run, _) = job.registry().find_or_create("abc");
        run.apply("running", "").await;
        job.registry().find_or_create("def");

        let view = get_run_for_commit(&jobs, "demo", "abc").unwrap();
        assert_eq!(view.run.number, 1);
        assert!(view.run.building);

        let numbers: Vec<u64> = list_runs(&jobs, "demo")
            .unwrap()
            .iter()
            .map(|view| view.run.number)
            .collect();
        assert_eq!(numbers, vec![2, 1]);
    }
}
