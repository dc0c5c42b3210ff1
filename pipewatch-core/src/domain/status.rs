//! Pipeline status vocabulary
//!
//! Maps the status strings reported by the external CI system onto the
//! internal [`RunResult`] model. Tags are matched exactly (case-sensitive).

use serde::{Deserialize, Serialize};

/// Detail tags that downgrade a `success` status to [`RunResult::Unstable`].
pub const WARNING_TAGS: &[&str] = &["passed with warnings", "success-with-warning"];

/// Final outcome of a tracked run
///
/// Declaration order is severity order: `Success` is the best outcome and
/// `Aborted` the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
}

impl RunResult {
    /// True when `self` is at least as good as `other`
    pub fn is_better_or_equal_to(self, other: RunResult) -> bool {
        self <= other
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunResult::Success => "SUCCESS",
            RunResult::Unstable => "UNSTABLE",
            RunResult::Failure => "FAILURE",
            RunResult::NotBuilt => "NOT_BUILT",
            RunResult::Aborted => "ABORTED",
        }
    }

    pub fn parse(s: &str) -> Option<RunResult> {
        match s {
            "SUCCESS" => Some(RunResult::Success),
            "UNSTABLE" => Some(RunResult::Unstable),
            "FAILURE" => Some(RunResult::Failure),
            "NOT_BUILT" => Some(RunResult::NotBuilt),
            "ABORTED" => Some(RunResult::Aborted),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known external pipeline status tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Manual,
    Created,
    Scheduled,
    Pending,
    /// Legacy tag with no documented meaning
    Factory,
    /// Legacy tag with no documented meaning
    Extended,
    Running,
    Skipped,
    Canceled,
    Failed,
    Success,
    SuccessWithWarnings,
}

impl PipelineStatus {
    pub fn from_tag(tag: &str) -> Option<PipelineStatus> {
        let status = match tag {
            "manual" | "manual-trigger" => PipelineStatus::Manual,
            "created" => PipelineStatus::Created,
            "schedule" | "scheduled" => PipelineStatus::Scheduled,
            "pending" => PipelineStatus::Pending,
            "factory" => PipelineStatus::Factory,
            "extended" => PipelineStatus::Extended,
            "running" => PipelineStatus::Running,
            "skipped" => PipelineStatus::Skipped,
            "canceled" => PipelineStatus::Canceled,
            "failed" => PipelineStatus::Failed,
            "success" => PipelineStatus::Success,
            t if WARNING_TAGS.contains(&t) => PipelineStatus::SuccessWithWarnings,
            _ => return None,
        };
        Some(status)
    }
}

/// How a status tag affects a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Known tag that carries no state change
    Ignore,
    /// Tag outside the vocabulary. Behaves like `Ignore` but gets reported.
    Unrecognized,
    /// The pipeline is executing
    Progress,
    /// The pipeline finished with the given result
    Terminal(RunResult),
}

impl Classification {
    /// True for both known and unrecognized no-op tags
    pub fn is_ignore(self) -> bool {
        matches!(self, Classification::Ignore | Classification::Unrecognized)
    }
}

/// Classify a status tag, refining `success` with the detail tag.
///
/// The detail only ever downgrades `Success` to `Unstable`.
pub fn classify(status: &str, detail: &str) -> Classification {
    let Some(status) = PipelineStatus::from_tag(status) else {
        return Classification::Unrecognized;
    };

    match status {
        PipelineStatus::Manual
        | PipelineStatus::Created
        | PipelineStatus::Scheduled
        | PipelineStatus::Pending
        | PipelineStatus::Factory
        | PipelineStatus::Extended => Classification::Ignore,
        PipelineStatus::Running => Classification::Progress,
        PipelineStatus::Skipped => Classification::Terminal(RunResult::NotBuilt),
        PipelineStatus::Canceled => Classification::Terminal(RunResult::Aborted),
        PipelineStatus::Failed => Classification::Terminal(RunResult::Failure),
        PipelineStatus::Success if WARNING_TAGS.contains(&detail) => {
            Classification::Terminal(RunResult::Unstable)
        }
        PipelineStatus::Success => Classification::Terminal(RunResult::Success),
        PipelineStatus::SuccessWithWarnings => Classification::Terminal(RunResult::Unstable),
    }
}
