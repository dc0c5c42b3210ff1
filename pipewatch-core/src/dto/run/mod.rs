//! Run DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::Job;
use crate::domain::run::{RunPhase, RunRecord, RunSnapshot};
use crate::estimate::RunProgress;

/// A run as served by the API: its persisted fields plus live progress
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunView {
    #[serde(flatten)]
    pub run: RunSnapshot,
    pub phase: RunPhase,
    pub progress: RunProgress,
}

impl RunView {
    pub fn build(job: &Job, run: &RunRecord, now: DateTime<Utc>) -> Self {
        Self::with_estimate(run, job.estimated_duration(), now)
    }

    /// Build with a precomputed estimate, for listing many runs of one job
    pub fn with_estimate(run: &RunRecord, estimate: Option<i64>, now: DateTime<Utc>) -> Self {
        let snapshot = run.snapshot();
        RunView {
            phase: snapshot.phase(),
            progress: RunProgress::compute(run.elapsed_ms_at(now), estimate),
            run: snapshot,
        }
    }
}
