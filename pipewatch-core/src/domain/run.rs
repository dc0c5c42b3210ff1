//! Run records
//!
//! A [`RunRecord`] tracks one external pipeline execution for a commit. It is
//! never executed locally: every change comes from a status tag reported by
//! the external CI system and goes through [`RunRecord::apply`].
//!
//! State machine:
//!
//! ```text
//! Created --running--> Building --terminal--> Completed(result)
//!    |                                            ^
//!    +------------------terminal------------------+   (compensated start)
//! ```
//!
//! Ignored tags are self-loops. Once a result is set the record is final.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::domain::log::{LogEntry, LogLevel, RunLog};
use crate::domain::status::{Classification, RunResult, classify};
use crate::store::{RunStore, StoredRun};

/// Longest duration a submitted run may report: one year
pub const MAX_SUBMITTED_DURATION_MS: i64 = 366 * 24 * 60 * 60 * 1000;

/// Observable lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Created,
    Building,
    Completed(RunResult),
}

/// What a single status delivery did to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Known tag without state change
    Ignored,
    /// Tag outside the vocabulary, no state change
    Unrecognized,
    /// The run entered the building state
    Started,
    /// Progress tag on a run that is already building
    AlreadyBuilding,
    /// The run reached a result
    Completed {
        result: RunResult,
        duration_ms: i64,
        /// False when the save collaborator failed; the in-memory result stands
        persisted: bool,
    },
    /// Re-delivery of the result the run already has
    Unchanged,
    /// Event for a run whose result is already final
    Stale,
    /// Submitted values out of range, no state change
    Rejected,
}

impl Transition {
    pub fn is_completed(&self) -> bool {
        matches!(self, Transition::Completed { .. })
    }
}

/// Plain-data copy of a run, as persisted and served over the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub id: Uuid,
    pub job: String,
    pub number: u64,
    pub commit: Option<String>,
    pub result: Option<RunResult>,
    pub building: bool,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
}

impl RunSnapshot {
    pub fn start_time(&self) -> DateTime<Utc> {
        self.started_at.unwrap_or(self.created_at)
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some() && !self.building
    }

    pub fn phase(&self) -> RunPhase {
        match self.result {
            Some(result) if !self.building => RunPhase::Completed(result),
            _ if self.building => RunPhase::Building,
            _ => RunPhase::Created,
        }
    }
}

#[derive(Debug, Default)]
struct RunState {
    result: Option<RunResult>,
    building: bool,
    started_at: Option<DateTime<Utc>>,
    duration_ms: i64,
    log: RunLog,
}

impl RunState {
    fn enter_building(&mut self, now: DateTime<Utc>) {
        self.building = true;
        self.started_at.get_or_insert(now);
        self.log.info(now, "Started");
    }
}

/// One tracked external pipeline run
pub struct RunRecord {
    id: Uuid,
    job: String,
    number: u64,
    commit: Option<String>,
    created_at: DateTime<Utc>,
    state: RwLock<RunState>,
    store: Arc<dyn RunStore>,
}

impl RunRecord {
    pub(crate) fn new(
        job: impl Into<String>,
        number: u64,
        commit: Option<String>,
        created_at: DateTime<Utc>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            job: job.into(),
            number,
            commit,
            created_at,
            state: RwLock::new(RunState::default()),
            store,
        }
    }

    /// Rebuild a record from storage
    pub(crate) fn restore(stored: StoredRun, store: Arc<dyn RunStore>) -> Self {
        let snapshot = stored.snapshot;
        Self {
            id: snapshot.id,
            job: snapshot.job,
            number: snapshot.number,
            commit: snapshot.commit,
            created_at: snapshot.created_at,
            state: RwLock::new(RunState {
                result: snapshot.result,
                building: snapshot.building,
                started_at: snapshot.started_at,
                duration_ms: snapshot.duration_ms,
                log: RunLog::from_entries(stored.log),
            }),
            store,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn commit(&self) -> Option<&str> {
        self.commit.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn result(&self) -> Option<RunResult> {
        self.read().result
    }

    pub fn duration_ms(&self) -> i64 {
        self.read().duration_ms
    }

    pub fn is_building(&self) -> bool {
        self.read().building
    }

    /// A terminal run has a result and is no longer building
    pub fn is_terminal(&self) -> bool {
        let state = self.read();
        state.result.is_some() && !state.building
    }

    pub fn phase(&self) -> RunPhase {
        self.snapshot().phase()
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.read().log.entries().to_vec()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let state = self.read();
        self.snapshot_of(&state)
    }

    /// Time spent so far: the final duration for finished runs, the time
    /// since the start for live ones.
    pub fn elapsed_ms_at(&self, now: DateTime<Utc>) -> i64 {
        let state = self.read();
        if state.result.is_some() {
            return state.duration_ms;
        }
        let start = state.started_at.unwrap_or(self.created_at);
        (now - start).num_milliseconds().max(0)
    }

    /// Apply a status delivery from the external system
    pub async fn apply(&self, status: &str, detail: &str) -> Transition {
        self.apply_at(status, detail, Utc::now()).await
    }

    /// [`RunRecord::apply`] with an explicit clock
    pub async fn apply_at(&self, status: &str, detail: &str, now: DateTime<Utc>) -> Transition {
        {
            let mut state = self.write();
            if state.result.is_none() {
                state.log.push(
                    now,
                    LogLevel::Debug,
                    format!("Received status: {} ({})", status, detail),
                );
            }
        }

        match classify(status, detail) {
            Classification::Unrecognized => {
                tracing::warn!(
                    "Run {} #{}: unknown pipeline status: {}",
                    self.job,
                    self.number,
                    status
                );
                let mut state = self.write();
                if state.result.is_none() {
                    state.log.warn(now, format!("Unknown pipeline status: {}", status));
                }
                Transition::Unrecognized
            }
            Classification::Ignore => {
                tracing::debug!(
                    "Run {} #{}: ignoring status: {}",
                    self.job,
                    self.number,
                    status
                );
                Transition::Ignored
            }
            Classification::Progress => self.start_building(now),
            Classification::Terminal(result) => self.complete(result, now).await,
        }
    }

    /// Complete a run from a remotely submitted result
    ///
    /// The run is backdated so that its start lies `duration_ms` before `now`.
    /// Negative durations count as zero. Durations above
    /// [`MAX_SUBMITTED_DURATION_MS`] leave the run untouched.
    pub async fn submit(
        &self,
        result: RunResult,
        duration_ms: i64,
        lines: &[String],
        now: DateTime<Utc>,
    ) -> Transition {
        let duration_ms = duration_ms.max(0);
        let Some(started_at) = backdated_start(now, duration_ms) else {
            tracing::warn!(
                "Run {} #{}: submitted duration {} ms out of range",
                self.job,
                self.number,
                duration_ms
            );
            return Transition::Rejected;
        };

        let (snapshot, log) = {
            let mut state = self.write();
            if state.result.is_some() {
                return Transition::Stale;
            }
            state.building = true;
            state.started_at = Some(started_at);
            for line in lines {
                state.log.info(now, line.clone());
            }
            state.result = Some(result);
            state.duration_ms = duration_ms;
            state.log.info(now, format!("Finished: {}", result));
            self.final_snapshot(&state)
        };

        tracing::info!(
            "Run {} #{} submitted with result {}",
            self.job,
            self.number,
            result
        );
        self.persist_completion(result, snapshot, log).await
    }

    fn start_building(&self, now: DateTime<Utc>) -> Transition {
        let mut state = self.write();
        if state.result.is_some() {
            tracing::warn!(
                "Run {} #{}: running status for a finished run ignored",
                self.job,
                self.number
            );
            return Transition::Stale;
        }
        if state.building {
            tracing::debug!("Run {} #{} already building", self.job, self.number);
            return Transition::AlreadyBuilding;
        }

        state.enter_building(now);
        tracing::info!("Run {} #{} building", self.job, self.number);
        Transition::Started
    }

    async fn complete(&self, result: RunResult, now: DateTime<Utc>) -> Transition {
        let (snapshot, log) = {
            let mut state = self.write();
            match state.result {
                Some(current) if current == result => {
                    tracing::debug!(
                        "Run {} #{} already has result {}",
                        self.job,
                        self.number,
                        result
                    );
                    return Transition::Unchanged;
                }
                Some(current) => {
                    tracing::warn!(
                        "Run {} #{}: result {} reported after final result {}, ignored",
                        self.job,
                        self.number,
                        result,
                        current
                    );
                    return Transition::Stale;
                }
                None => {}
            }

            if !state.building {
                // The running event was missed; start now so the duration stays consistent.
                tracing::info!(
                    "Run {} #{}: terminal status before running, starting build",
                    self.job,
                    self.number
                );
                state
                    .log
                    .warn(now, "Terminal status received before running");
                state.enter_building(now);
            }

            tracing::info!(
                "Run {} #{} result change: none to {}",
                self.job,
                self.number,
                result
            );
            let start = state.started_at.unwrap_or(self.created_at);
            state.result = Some(result);
            state.duration_ms = (now - start).num_milliseconds().max(0);
            state.log.info(now, format!("Finished: {}", result));
            self.final_snapshot(&state)
        };

        self.persist_completion(result, snapshot, log).await
    }

    /// Save the finished run, then leave the building state.
    ///
    /// The write lock is not held across the save.
    async fn persist_completion(
        &self,
        result: RunResult,
        snapshot: RunSnapshot,
        log: Vec<LogEntry>,
    ) -> Transition {
        let persisted = match self.store.save(&snapshot, &log).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    "Failed to save run record {} #{}: {}",
                    self.job,
                    self.number,
                    err
                );
                false
            }
        };

        self.write().building = false;

        tracing::info!(
            "Run {} #{} started at {}, duration {} ms",
            self.job,
            self.number,
            snapshot.start_time(),
            snapshot.duration_ms
        );

        Transition::Completed {
            result,
            duration_ms: snapshot.duration_ms,
            persisted,
        }
    }

    fn final_snapshot(&self, state: &RunState) -> (RunSnapshot, Vec<LogEntry>) {
        let mut snapshot = self.snapshot_of(state);
        snapshot.building = false;
        (snapshot, state.log.entries().to_vec())
    }

    fn snapshot_of(&self, state: &RunState) -> RunSnapshot {
        RunSnapshot {
            id: self.id,
            job: self.job.clone(),
            number: self.number,
            commit: self.commit.clone(),
            result: state.result,
            building: state.building,
            created_at: self.created_at,
            started_at: state.started_at,
            duration_ms: state.duration_ms,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RunState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RunState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RunRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRecord")
            .field("id", &self.id)
            .field("job", &self.job)
            .field("number", &self.number)
            .field("commit", &self.commit)
            .finish_non_exhaustive()
    }
}

/// Start time of a run that took `duration_ms` and ended at `now`
pub fn backdated_start(now: DateTime<Utc>, duration_ms: i64) -> Option<DateTime<Utc>> {
    if duration_ms > MAX_SUBMITTED_DURATION_MS {
        return None;
    }
    TimeDelta::try_milliseconds(duration_ms).and_then(|delta| now.checked_sub_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn record(store: &Arc<MemoryStore>, created_at: DateTime<Utc>) -> RunRecord {
        RunRecord::new("demo_master", 1, Some("abc123".to_string()), created_at, store.clone())
    }

    #[tokio::test]
    async fn test_running_then_success() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);

        let t1 = t0 + Duration::seconds(5);
        assert_eq!(run.apply_at("running", "running", t1).await, Transition::Started);
        assert_eq!(run.phase(), RunPhase::Building);
        assert_eq!(run.result(), None);

        let t2 = t1 + Duration::seconds(30);
        let transition = run.apply_at("success", "passed", t2).await;
        assert_eq!(
            transition,
            Transition::Completed {
                result: RunResult::Success,
                duration_ms: 30_000,
                persisted: true
            }
        );
        assert_eq!(run.phase(), RunPhase::Completed(RunResult::Success));
        assert!(!run.is_building());
        assert_eq!(store.save_count(), 1);

        let stored = store.stored_run("demo_master", 1).unwrap();
        assert_eq!(stored.snapshot.result, Some(RunResult::Success));
        assert!(!stored.snapshot.building);
        assert_eq!(stored.snapshot.duration_ms, 30_000);
        assert!(stored.log.iter().any(|e| e.message == "Finished: SUCCESS"));
    }

    #[tokio::test]
    async fn test_repeated_terminal_status_saves_once() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);
        run.apply_at("running", "", t0).await;

        let first = run.apply_at("failed", "", t0 + Duration::seconds(10)).await;
        let second = run.apply_at("failed", "", t0 + Duration::seconds(20)).await;

        assert!(first.is_completed());
        assert_eq!(second, Transition::Unchanged);
        assert_eq!(store.save_count(), 1);
        assert_eq!(run.duration_ms(), 10_000);
    }

    #[tokio::test]
    async fn test_terminal_without_running_compensates() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);

        let transition = run.apply_at("canceled", "", t0 + Duration::seconds(3)).await;

        assert!(transition.is_completed());
        assert_eq!(run.phase(), RunPhase::Completed(RunResult::Aborted));
        assert!(!run.is_building());
        assert!(run.duration_ms() >= 0);
        assert!(run.snapshot().started_at.is_some());
        assert!(run.log().iter().any(|e| e.message == "Started"));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_duration_is_clamped_to_zero() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);
        run.apply_at("running", "", t0).await;

        run.apply_at("success", "", t0 - Duration::seconds(60)).await;

        assert_eq!(run.duration_ms(), 0);
    }

    #[tokio::test]
    async fn test_save_failure_keeps_result_in_memory() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_saves(true);
        let t0 = Utc::now();
        let run = record(&store, t0);

        let transition = run.apply_at("success", "passed with warnings", t0).await;

        assert_eq!(
            transition,
            Transition::Completed {
                result: RunResult::Unstable,
                duration_ms: 0,
                persisted: false
            }
        );
        assert_eq!(run.result(), Some(RunResult::Unstable));
        assert!(run.is_terminal());
        assert_eq!(store.stored_run_count(), 0);
    }

    #[tokio::test]
    async fn test_finished_run_is_immutable() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);
        run.apply_at("success", "", t0).await;
        let before = run.snapshot();

        assert_eq!(run.apply_at("failed", "", t0).await, Transition::Stale);
        assert_eq!(run.apply_at("running", "", t0).await, Transition::Stale);
        assert_eq!(run.apply_at("bogus", "", t0).await, Transition::Unrecognized);

        assert_eq!(run.snapshot(), before);
        // received status, compensation notice, Started, Finished
        assert_eq!(run.log().len(), 4);
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_ignored_and_unknown_tags_do_not_change_state() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);

        assert_eq!(run.apply_at("created", "", t0).await, Transition::Ignored);
        assert_eq!(run.apply_at("pending", "", t0).await, Transition::Ignored);
        assert_eq!(run.apply_at("factory", "", t0).await, Transition::Ignored);
        assert_eq!(run.apply_at("exploded", "", t0).await, Transition::Unrecognized);

        assert_eq!(run.phase(), RunPhase::Created);
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_second_running_keeps_original_start() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);

        run.apply_at("running", "", t0).await;
        let again = run.apply_at("running", "", t0 + Duration::seconds(9)).await;

        assert_eq!(again, Transition::AlreadyBuilding);
        assert_eq!(run.snapshot().started_at, Some(t0));
    }

    #[tokio::test]
    async fn test_elapsed_for_live_and_finished_runs() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = record(&store, t0);
        run.apply_at("running", "", t0).await;

        assert_eq!(run.elapsed_ms_at(t0 + Duration::seconds(4)), 4_000);

        run.apply_at("success", "", t0 + Duration::seconds(7)).await;
        assert_eq!(run.elapsed_ms_at(t0 + Duration::hours(1)), 7_000);
    }

    #[tokio::test]
    async fn test_submit_backdates_start() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = RunRecord::new("monitor", 1, None, t0, store.clone());

        let lines = vec!["compiling".to_string(), "done".to_string()];
        let transition = run.submit(RunResult::Failure, 100, &lines, t0).await;

        assert!(transition.is_completed());
        let snapshot = run.snapshot();
        assert_eq!(snapshot.duration_ms, 100);
        assert_eq!(snapshot.start_time(), t0 - Duration::milliseconds(100));
        assert_eq!(run.log().len(), 3);
        assert_eq!(run.submit(RunResult::Success, 5, &[], t0).await, Transition::Stale);
    }

    #[tokio::test]
    async fn test_submit_rejects_out_of_range_duration() {
        let store = Arc::new(MemoryStore::new());
        let t0 = Utc::now();
        let run = RunRecord::new("monitor", 1, None, t0, store.clone());

        let transition = run.submit(RunResult::Success, i64::MAX / 2, &[], t0).await;

        assert_eq!(transition, Transition::Rejected);
        assert_eq!(run.phase(), RunPhase::Created);
        assert!(!run.is_building());
        assert_eq!(run.snapshot().started_at, None);
        assert_eq!(store.save_count(), 0);

        let transition = run
            .submit(RunResult::Success, MAX_SUBMITTED_DURATION_MS, &[], t0)
            .await;
        assert!(transition.is_completed());
        assert_eq!(run.duration_ms(), MAX_SUBMITTED_DURATION_MS);
    }

    #[test]
    fn test_backdated_start_bounds() {
        let t0 = Utc::now();

        assert_eq!(backdated_start(t0, 0), Some(t0));
        assert_eq!(backdated_start(t0, 1_500), Some(t0 - Duration::milliseconds(1_500)));
        assert_eq!(backdated_start(t0, MAX_SUBMITTED_DURATION_MS + 1), None);
        assert_eq!(backdated_start(t0, i64::MAX), None);
        assert_eq!(backdated_start(DateTime::<Utc>::MIN_UTC, 1), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_terminal_deliveries_save_once() {
        let store = Arc::new(MemoryStore::new());
        let run = Arc::new(record(&store, Utc::now()));
        run.apply("running", "").await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let run = run.clone();
                tokio::spawn(async move { run.apply("success", "").await })
            })
            .collect();
        let mut transitions = Vec::new();
        for handle in handles {
            transitions.push(handle.await.unwrap());
        }

        let completed = transitions.iter().filter(|t| t.is_completed()).count();
        assert_eq!(completed, 1);
        assert!(
            transitions
                .iter()
                .filter(|t| !t.is_completed())
                .all(|t| *t == Transition::Unchanged)
        );
        assert_eq!(store.save_count(), 1);
        assert_eq!(run.result(), Some(RunResult::Success));
        assert!(!run.is_building());
    }
}
