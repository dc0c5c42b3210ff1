//! Job DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobKind};
use crate::domain::status::RunResult;
use crate::dto::run::RunView;
use crate::estimate::UNKNOWN_DURATION;

/// Request to create a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJob {
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: JobKind,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub max_runs: Option<u32>,
}

fn default_kind() -> JobKind {
    JobKind::Pipeline
}

/// Summary information about a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub name: String,
    pub kind: JobKind,
    pub display_name: Option<String>,
    pub max_runs: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub run_count: usize,
    /// Result of the newest finished run
    pub last_result: Option<RunResult>,
    /// Number of runs still waiting for a result
    pub live_runs: usize,
}

impl From<&Job> for JobSummary {
    fn from(job: &Job) -> Self {
        let history = job.history();
        let definition = job.definition();

        JobSummary {
            name: definition.name.clone(),
            kind: definition.kind,
            display_name: definition.display_name.clone(),
            max_runs: definition.max_runs,
            created_at: definition.created_at,
            run_count: history.len(),
            last_result: history
                .iter()
                .find(|run| run.is_terminal())
                .and_then(|run| run.result),
            live_runs: history.iter().filter(|run| run.result.is_none()).count(),
        }
    }
}

/// Job summary plus duration estimate and its most recent runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetails {
    #[serde(flatten)]
    pub summary: JobSummary,
    /// `-1` when unknown
    pub estimated_duration_ms: i64,
    pub recent_runs: Vec<RunView>,
}

impl JobDetails {
    pub fn build(job: &Job, recent: usize, now: DateTime<Utc>) -> Self {
        let estimate = job.estimated_duration();
        let recent_runs = job
            .registry()
            .runs()
            .iter()
            .take(recent)
            .map(|run| RunView::with_estimate(run, estimate, now))
            .collect();

        JobDetails {
            summary: JobSummary::from(job),
            estimated_duration_ms: estimate.unwrap_or(UNKNOWN_DURATION),
            recent_runs,
        }
    }
}
