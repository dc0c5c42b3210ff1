//! Duration estimation
//!
//! Expected run duration derived from a job's recent history, and the
//! progress, remaining-time and stuck heuristics built on top of it. All
//! values are milliseconds.

use serde::{Deserialize, Serialize};

use crate::domain::run::RunSnapshot;
use crate::domain::status::RunResult;

/// Boundary representation of an unknown estimate or progress
pub const UNKNOWN_DURATION: i64 = -1;

/// Most recent runs inspected when estimating
const INSPECTED_RUNS: usize = 6;
/// Runs averaged into the estimate
const CANDIDATES: usize = 3;
/// A build with no estimate is considered stuck after a day
const STUCK_WITHOUT_ESTIMATE_MS: i64 = 24 * 60 * 60 * 1000;
/// A build is considered stuck after this many times its estimate
const STUCK_FACTOR: i64 = 10;

/// Estimate the duration of the next run from `history` (newest first).
///
/// Runs that finished at least as well as unstable are preferred; other
/// finished runs only pad the candidate set, oldest first. Returns `None`
/// when there is no usable signal.
pub fn estimate_duration<'a, I>(history: I) -> Option<i64>
where
    I: IntoIterator<Item = &'a RunSnapshot>,
{
    let mut good = Vec::with_capacity(CANDIDATES);
    let mut fallback = Vec::new();

    for run in history.into_iter().take(INSPECTED_RUNS) {
        if good.len() == CANDIDATES {
            break;
        }
        if run.building {
            continue;
        }
        match run.result {
            Some(result) if result.is_better_or_equal_to(RunResult::Unstable) => {
                good.push(run.duration_ms)
            }
            Some(_) => fallback.push(run.duration_ms),
            None => {}
        }
    }

    let mut candidates = good;
    let missing = CANDIDATES - candidates.len();
    candidates.extend(fallback.iter().rev().take(missing));

    if candidates.is_empty() {
        return None;
    }

    let total: i64 = candidates.iter().sum();
    let mean = (total as f64 / candidates.len() as f64).round() as i64;
    (mean != 0).then_some(mean)
}

/// Advisory check for a build that has run far longer than expected
pub fn is_likely_stuck(elapsed_ms: i64, estimate: Option<i64>) -> bool {
    match estimate {
        Some(estimate) => elapsed_ms > STUCK_FACTOR * estimate,
        None => elapsed_ms > STUCK_WITHOUT_ESTIMATE_MS,
    }
}

/// Completion percentage, capped at 99 until the run actually finishes.
/// `-1` when no estimate is available.
pub fn progress_percent(elapsed_ms: i64, estimate: Option<i64>) -> i32 {
    match estimate {
        Some(estimate) if estimate > 0 => {
            let percent = elapsed_ms.max(0) * 100 / estimate;
            percent.min(99) as i32
        }
        _ => UNKNOWN_DURATION as i32,
    }
}

/// Expected time left, `None` when unknown or already overdue
pub fn remaining_ms(elapsed_ms: i64, estimate: Option<i64>) -> Option<i64> {
    let eta = estimate? - elapsed_ms;
    (eta > 0).then_some(eta)
}

/// Progress view of a single run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunProgress {
    pub elapsed_ms: i64,
    /// `-1` when unknown
    pub estimated_duration_ms: i64,
    /// `-1` when unknown
    pub progress: i32,
    pub remaining_ms: Option<i64>,
    pub likely_stuck: bool,
}

impl RunProgress {
    pub fn compute(elapsed_ms: i64, estimate: Option<i64>) -> Self {
        Self {
            elapsed_ms,
            estimated_duration_ms: estimate.unwrap_or(UNKNOWN_DURATION),
            progress: progress_percent(elapsed_ms, estimate),
            remaining_ms: remaining_ms(elapsed_ms, estimate),
            likely_stuck: is_likely_stuck(elapsed_ms, estimate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn run(result: Option<RunResult>, duration_ms: i64, building: bool) -> RunSnapshot {
        let now = Utc::now();
        RunSnapshot {
            id: Uuid::new_v4(),
            job: "demo".to_string(),
            number: 0,
            commit: None,
            result,
            building,
            created_at: now,
            started_at: Some(now),
            duration_ms,
        }
    }

    fn finished(result: RunResult, duration_ms: i64) -> RunSnapshot {
        run(Some(result), duration_ms, false)
    }

    #[test]
    fn test_mean_of_three_most_recent_successes() {
        // oldest to newest: 10, 20, ..., 60
        let mut history: Vec<RunSnapshot> = [10, 20, 30, 40, 50, 60]
            .iter()
            .map(|d| finished(RunResult::Success, *d))
            .collect();
        history.reverse();

        assert_eq!(estimate_duration(&history), Some(50));
    }

    #[test]
    fn test_no_history_is_unknown() {
        assert_eq!(estimate_duration(&Vec::<RunSnapshot>::new()), None);
    }

    #[test]
    fn test_failures_pad_the_candidates() {
        let history = vec![
            finished(RunResult::Failure, 20),
            finished(RunResult::Failure, 10),
        ];

        assert_eq!(estimate_duration(&history), Some(15));
    }

    #[test]
    fn test_padding_takes_oldest_fallback_first() {
        let history = vec![
            finished(RunResult::Success, 100),
            finished(RunResult::Failure, 7),
            finished(RunResult::Unstable, 200),
            finished(RunResult::Aborted, 1),
            finished(RunResult::Failure, 3),
        ];

        // good: 100, 200; padded with the oldest fallback (3)
        assert_eq!(estimate_duration(&history), Some(101));
    }

    #[test]
    fn test_only_six_runs_are_inspected() {
        let mut history: Vec<RunSnapshot> = (0..6).map(|_| finished(RunResult::Failure, 10)).collect();
        history.push(finished(RunResult::Success, 1_000));

        assert_eq!(estimate_duration(&history), Some(10));
    }

    #[test]
    fn test_live_runs_are_skipped() {
        let history = vec![
            run(None, 0, true),
            run(None, 0, false),
            run(Some(RunResult::Success), 999, true),
            finished(RunResult::Success, 40),
        ];

        assert_eq!(estimate_duration(&history), Some(40));
    }

    #[test]
    fn test_zero_mean_is_unknown() {
        let history = vec![finished(RunResult::Success, 0), finished(RunResult::Success, 0)];

        assert_eq!(estimate_duration(&history), None);
    }

    #[test]
    fn test_mean_rounds_to_nearest() {
        let history = vec![
            finished(RunResult::Success, 1),
            finished(RunResult::Success, 1),
            finished(RunResult::Success, 2),
        ];

        assert_eq!(estimate_duration(&history), Some(1));

        let history = vec![finished(RunResult::Success, 1), finished(RunResult::Success, 2)];
        assert_eq!(estimate_duration(&history), Some(2));
    }

    #[test]
    fn test_stuck_heuristic() {
        assert!(!is_likely_stuck(1_000, Some(100)));
        assert!(is_likely_stuck(1_001, Some(100)));
        assert!(!is_likely_stuck(STUCK_WITHOUT_ESTIMATE_MS, None));
        assert!(is_likely_stuck(STUCK_WITHOUT_ESTIMATE_MS + 1, None));
    }

    #[test]
    fn test_progress_is_capped_below_completion() {
        assert_eq!(progress_percent(500, None), -1);
        assert_eq!(progress_percent(0, Some(1_000)), 0);
        assert_eq!(progress_percent(505, Some(1_000)), 50);
        assert_eq!(progress_percent(1_000, Some(1_000)), 99);
        assert_eq!(progress_percent(50_000, Some(1_000)), 99);
    }

    #[test]
    fn test_remaining_time() {
        assert_eq!(remaining_ms(300, Some(1_000)), Some(700));
        assert_eq!(remaining_ms(1_000, Some(1_000)), None);
        assert_eq!(remaining_ms(300, None), None);
    }

    #[test]
    fn test_run_progress_uses_sentinels() {
        let progress = RunProgress::compute(1_000, None);

        assert_eq!(progress.estimated_duration_ms, UNKNOWN_DURATION);
        assert_eq!(progress.progress, -1);
        assert_eq!(progress.remaining_ms, None);
        assert!(!progress.likely_stuck);
    }
}
