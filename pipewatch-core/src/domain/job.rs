//! Job domain types
//!
//! A job is the local home of an externally executed pipeline. It owns the
//! [`RunRegistry`] holding every run observed for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::domain::run::{MAX_SUBMITTED_DURATION_MS, RunRecord, RunSnapshot, Transition};
use crate::domain::status::RunResult;
use crate::estimate::{RunProgress, estimate_duration};
use crate::registry::RunRegistry;
use crate::store::{RunStore, StoreError, StoredRun};

const MAX_NAME_LENGTH: usize = 255;

/// What feeds a job with runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    /// Runs are driven by pipeline webhooks
    Pipeline,
    /// Runs are posted as finished results
    ExternalMonitor,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Pipeline => "Pipeline",
            JobKind::ExternalMonitor => "ExternalMonitor",
        }
    }

    pub fn parse(s: &str) -> Option<JobKind> {
        match s {
            "Pipeline" => Some(JobKind::Pipeline),
            "ExternalMonitor" => Some(JobKind::ExternalMonitor),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted job configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    pub kind: JobKind,
    pub display_name: Option<String>,
    /// Finished runs beyond the newest `max_runs` are rotated away
    pub max_runs: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Check that a job name only uses `[A-Za-z0-9_-]`
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Job name cannot be empty".to_string());
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(format!(
            "Job name too long (max: {} chars)",
            MAX_NAME_LENGTH
        ));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("Job name contains invalid character '{}'", c));
    }
    Ok(())
}

/// Remote submission of an already finished run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRun {
    pub result: RunResult,
    pub duration_ms: i64,
    #[serde(default)]
    pub log: Vec<String>,
}

impl SubmitRun {
    /// Check that the reported duration can be recorded
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_ms > MAX_SUBMITTED_DURATION_MS {
            return Err(format!(
                "Duration too long: {} ms (max: {} ms)",
                self.duration_ms, MAX_SUBMITTED_DURATION_MS
            ));
        }
        Ok(())
    }
}

pub struct Job {
    definition: JobDefinition,
    registry: RunRegistry,
    store: Arc<dyn RunStore>,
}

impl Job {
    pub fn new(definition: JobDefinition, store: Arc<dyn RunStore>) -> Self {
        let registry = RunRegistry::new(definition.name.clone(), store.clone());
        Self {
            definition,
            registry,
            store,
        }
    }

    /// Rebuild a job and its runs from storage
    pub fn restore(
        definition: JobDefinition,
        store: Arc<dyn RunStore>,
        runs: Vec<StoredRun>,
        next_number: u64,
    ) -> Self {
        let registry =
            RunRegistry::restore(definition.name.clone(), store.clone(), runs, next_number);
        Self {
            definition,
            registry,
            store,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn kind(&self) -> JobKind {
        self.definition.kind
    }

    pub fn definition(&self) -> &JobDefinition {
        &self.definition
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Snapshots of all runs, newest first
    pub fn history(&self) -> Vec<RunSnapshot> {
        self.registry
            .runs()
            .iter()
            .map(|run| run.snapshot())
            .collect()
    }

    /// Expected duration of the next run, `None` when unknown
    pub fn estimated_duration(&self) -> Option<i64> {
        estimate_duration(&self.history())
    }

    pub fn progress(&self, run: &RunRecord, now: DateTime<Utc>) -> RunProgress {
        let estimate = self.estimated_duration();
        RunProgress::compute(run.elapsed_ms_at(now), estimate)
    }

    /// Delete a run and its registry entry.
    ///
    /// The registry entry goes away even when storage deletion fails.
    pub async fn delete_run(&self, number: u64) -> Result<bool, StoreError> {
        let Some(run) = self.registry.remove(number) else {
            return Ok(false);
        };
        tracing::info!("Deleting run {} #{}", self.name(), run.number());
        self.store.delete(self.name(), number).await?;
        Ok(true)
    }

    /// Delete finished runs beyond the retention limit.
    ///
    /// Live runs are never rotated. Returns the number of deleted runs, or
    /// the first storage error after attempting every deletion.
    pub async fn log_rotate(&self) -> Result<usize, StoreError> {
        let Some(max_runs) = self.definition.max_runs else {
            return Ok(0);
        };

        let expired: Vec<u64> = self
            .registry
            .runs()
            .iter()
            .skip(max_runs as usize)
            .filter(|run| run.is_terminal())
            .map(|run| run.number())
            .collect();

        let mut deleted = 0;
        let mut first_error = None;
        for number in expired {
            match self.delete_run(number).await {
                Ok(true) => deleted += 1,
                Ok(false) => {}
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }

        if deleted > 0 {
            tracing::info!("Rotated {} run(s) from job {}", deleted, self.name());
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(deleted),
        }
    }

    /// Record a finished run posted by a remote system
    ///
    /// Invalid submissions are refused before a run number is taken.
    pub async fn submit(&self, req: &SubmitRun) -> Result<(Arc<RunRecord>, Transition), String> {
        req.validate()?;

        let run = self.registry.create_detached();
        self.record_issued_numbers().await;
        let transition = run
            .submit(req.result, req.duration_ms, &req.log, Utc::now())
            .await;
        self.rotate_after_completion().await;
        Ok((run, transition))
    }

    /// Persist the registry's numbering after a new run was created.
    ///
    /// Failures are logged only; the run itself is unaffected.
    pub async fn record_issued_numbers(&self) {
        let next = self.registry.next_number();
        if let Err(err) = self.store.record_next_number(self.name(), next).await {
            tracing::error!(
                "Failed to record next run number {} for job {}: {}",
                next,
                self.name(),
                err
            );
        }
    }

    /// Log rotation after a run finished. Failures are logged only.
    pub async fn rotate_after_completion(&self) {
        if let Err(err) = self.log_rotate().await {
            tracing::error!("Failed to rotate log for job {}: {}", self.name(), err);
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("definition", &self.definition)
            .field("runs", &self.registry.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{JobCatalog, MemoryStore};

    fn definition(kind: JobKind, max_runs: Option<u32>) -> JobDefinition {
        JobDefinition {
            name: "demo_master".to_string(),
            kind,
            display_name: None,
            max_runs,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("My_Project_feature_x-1").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("slash/name").is_err());
        assert!(validate_name(&"a".repeat(256)).is_err());
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [JobKind::Pipeline, JobKind::ExternalMonitor] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("Freestyle"), None);
    }

    #[tokio::test]
    async fn test_log_rotate_keeps_newest_and_live_runs() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::Pipeline, Some(2)), store.clone());

        for commit in ["a", "b", "c"] {
            let (run, _) = job.registry().find_or_create(commit);
            run.apply("success", "").await;
        }
        // live run, newest
        let (live, _) = job.registry().find_or_create("d");
        live.apply("running", "").await;

        let deleted = job.log_rotate().await.unwrap();

        assert_eq!(deleted, 2);
        let numbers: Vec<u64> = job.history().iter().map(|run| run.number).collect();
        assert_eq!(numbers, vec![4, 3]);
        assert!(job.registry().for_commit("a").is_none());
        assert_eq!(store.delete_count(), 2);
    }

    #[tokio::test]
    async fn test_log_rotate_without_limit_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::Pipeline, None), store.clone());
        let (run, _) = job.registry().find_or_create("a");
        run.apply("failed", "").await;

        assert_eq!(job.log_rotate().await.unwrap(), 0);
        assert_eq!(store.delete_count(), 0);
    }

    #[tokio::test]
    async fn test_log_rotate_reports_storage_failure() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_deletes(true);
        let job = Job::new(definition(JobKind::Pipeline, Some(0)), store.clone());
        let (run, _) = job.registry().find_or_create("a");
        run.apply("failed", "").await;

        assert!(job.log_rotate().await.is_err());
        assert!(job.registry().is_empty());
    }

    #[tokio::test]
    async fn test_delete_run_removes_registry_entry() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::Pipeline, None), store.clone());
        let (run, _) = job.registry().find_or_create("abc");
        run.apply("success", "").await;

        assert!(job.delete_run(1).await.unwrap());
        assert!(!job.delete_run(1).await.unwrap());
        assert!(job.registry().for_commit("abc").is_none());
        assert!(store.stored_run("demo_master", 1).is_none());
    }

    #[tokio::test]
    async fn test_submit_records_finished_run() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::ExternalMonitor, None), store.clone());

        let (run, transition) = job
            .submit(&SubmitRun {
                result: RunResult::Success,
                duration_ms: 100,
                log: vec!["hello".to_string()],
            })
            .await
            .unwrap();

        assert!(transition.is_completed());
        assert_eq!(run.commit(), None);
        assert_eq!(run.duration_ms(), 100);
        assert_eq!(store.save_count(), 1);
        assert_eq!(job.estimated_duration(), Some(100));
    }

    #[tokio::test]
    async fn test_progress_of_live_run() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::ExternalMonitor, None), store);
        job.submit(&SubmitRun {
            result: RunResult::Success,
            duration_ms: 10_000,
            log: Vec::new(),
        })
        .await
        .unwrap();

        let (run, _) = job.registry().find_or_create("abc");
        let start = Utc::now();
        run.apply_at("running", "", start).await;

        let progress = job.progress(&run, start + chrono::Duration::seconds(5));
        assert_eq!(progress.estimated_duration_ms, 10_000);
        assert_eq!(progress.progress, 50);
        assert_eq!(progress.remaining_ms, Some(5_000));
        assert!(!progress.likely_stuck);
    }

    #[tokio::test]
    async fn test_submit_refuses_out_of_range_duration() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::ExternalMonitor, None), store.clone());

        let result = job
            .submit(&SubmitRun {
                result: RunResult::Success,
                duration_ms: i64::MAX / 2,
                log: Vec::new(),
            })
            .await;

        assert!(result.is_err());
        assert!(job.registry().is_empty());
        assert_eq!(job.registry().next_number(), 1);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_new_runs_record_issued_numbers() {
        let store = Arc::new(MemoryStore::new());
        let job = Job::new(definition(JobKind::ExternalMonitor, None), store.clone());

        job.submit(&SubmitRun {
            result: RunResult::Failure,
            duration_ms: 5,
            log: Vec::new(),
        })
        .await
        .unwrap();
        job.submit(&SubmitRun {
            result: RunResult::Success,
            duration_ms: 5,
            log: Vec::new(),
        })
        .await
        .unwrap();
        job.delete_run(2).await.unwrap();

        assert_eq!(store.load_next_number("demo_master").await.unwrap(), 3);
    }
}
