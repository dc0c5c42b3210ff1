//! Run registry
//!
//! Per-job bookkeeping of runs: the append-only run list and the map from
//! commit identifier to the most recent run for that commit. Both live under
//! a single mutex so that two deliveries for the same unseen commit cannot
//! create two live runs.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::run::RunRecord;
use crate::store::{RunStore, StoredRun};

/// How [`RunRegistry::find_or_create`] resolved a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
    /// First event for this commit
    Created,
    /// The commit already has a live run
    Existing,
    /// The commit's previous run had finished; a fresh run replaced it
    Restarted { previous: u64 },
}

#[derive(Default)]
struct Runs {
    by_commit: HashMap<String, Arc<RunRecord>>,
    /// Ordered by build number, oldest first
    list: Vec<Arc<RunRecord>>,
    next_number: u64,
}

pub struct RunRegistry {
    job: String,
    store: Arc<dyn RunStore>,
    runs: Mutex<Runs>,
}

impl RunRegistry {
    pub fn new(job: impl Into<String>, store: Arc<dyn RunStore>) -> Self {
        Self {
            job: job.into(),
            store,
            runs: Mutex::new(Runs {
                next_number: 1,
                ..Runs::default()
            }),
        }
    }

    /// Rebuild a registry from stored runs.
    ///
    /// Each commit maps to its highest-numbered run. Numbering resumes above
    /// both `next_number` and every stored run, so numbers issued before a
    /// restart are never handed out again.
    pub fn restore(
        job: impl Into<String>,
        store: Arc<dyn RunStore>,
        stored: Vec<StoredRun>,
        next_number: u64,
    ) -> Self {
        let registry = Self::new(job, store);
        let mut records: Vec<Arc<RunRecord>> = stored
            .into_iter()
            .map(|run| Arc::new(RunRecord::restore(run, registry.store.clone())))
            .collect();
        records.sort_by_key(|run| run.number());

        {
            let mut runs = registry.lock();
            runs.next_number = runs.next_number.max(next_number);
            for record in records {
                if let Some(commit) = record.commit() {
                    runs.by_commit.insert(commit.to_string(), record.clone());
                }
                runs.next_number = runs.next_number.max(record.number() + 1);
                runs.list.push(record);
            }
        }

        registry
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    /// Resolve the run a delivery for `commit` belongs to.
    ///
    /// A live run is reused. A finished run is left untouched and superseded
    /// by a new one, which the commit map then points to.
    pub fn find_or_create(&self, commit: &str) -> (Arc<RunRecord>, Attach) {
        let mut runs = self.lock();

        let attach = match runs.by_commit.get(commit) {
            Some(existing) if !existing.is_terminal() => {
                return (existing.clone(), Attach::Existing);
            }
            Some(previous) => {
                tracing::info!(
                    "Commit {} restarted in job {} (previous run #{})",
                    commit,
                    self.job,
                    previous.number()
                );
                Attach::Restarted {
                    previous: previous.number(),
                }
            }
            None => Attach::Created,
        };

        let record = self.push_new(&mut runs, Some(commit.to_string()));
        runs.by_commit.insert(commit.to_string(), record.clone());
        tracing::info!(
            "Creating run #{} in job {} for commit {}",
            record.number(),
            self.job,
            commit
        );

        (record, attach)
    }

    /// Number the next new run will get
    pub fn next_number(&self) -> u64 {
        self.lock().next_number
    }

    /// Create a run that is not tied to any commit
    pub fn create_detached(&self) -> Arc<RunRecord> {
        let mut runs = self.lock();
        self.push_new(&mut runs, None)
    }

    /// All runs, newest first
    pub fn runs(&self) -> Vec<Arc<RunRecord>> {
        self.lock().list.iter().rev().cloned().collect()
    }

    pub fn get(&self, number: u64) -> Option<Arc<RunRecord>> {
        self.lock()
            .list
            .iter()
            .find(|run| run.number() == number)
            .cloned()
    }

    /// The run the commit currently maps to
    pub fn for_commit(&self, commit: &str) -> Option<Arc<RunRecord>> {
        self.lock().by_commit.get(commit).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a run from the list, and from the commit map if it is the run the
    /// commit points to.
    pub fn remove(&self, number: u64) -> Option<Arc<RunRecord>> {
        let mut runs = self.lock();
        let index = runs.list.iter().position(|run| run.number() == number)?;
        let record = runs.list.remove(index);

        if let Some(commit) = record.commit() {
            let mapped = runs
                .by_commit
                .get(commit)
                .is_some_and(|current| Arc::ptr_eq(current, &record));
            if mapped {
                runs.by_commit.remove(commit);
            }
        }

        Some(record)
    }

    fn push_new(&self, runs: &mut Runs, commit: Option<String>) -> Arc<RunRecord> {
        let number = runs.next_number;
        runs.next_number += 1;

        let record = Arc::new(RunRecord::new(
            self.job.clone(),
            number,
            commit,
            Utc::now(),
            self.store.clone(),
        ));
        runs.list.push(record.clone());
        record
    }

    fn lock(&self) -> MutexGuard<'_, Runs> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::run::RunSnapshot;
    use crate::domain::status::RunResult;
    use crate::store::MemoryStore;

    fn registry() -> (Arc<MemoryStore>, RunRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = RunRegistry::new("demo_master", store.clone());
        (store, registry)
    }

    #[test]
    fn test_first_event_creates_run() {
        let (_, registry) = registry();

        let (run, attach) = registry.find_or_create("abc");

        assert_eq!(attach, Attach::Created);
        assert_eq!(run.number(), 1);
        assert_eq!(run.commit(), Some("abc"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_live_run_is_reused() {
        let (_, registry) = registry();
        let (first, _) = registry.find_or_create("abc");
        first.apply("running", "").await;

        let (second, attach) = registry.find_or_create("abc");

        assert_eq!(attach, Attach::Existing);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_finished_commit_restarts() {
        let (_, registry) = registry();
        let (r1, _) = registry.find_or_create("abc");
        r1.apply("success", "").await;
        let before = r1.snapshot();

        let (r2, attach) = registry.find_or_create("abc");

        assert_eq!(attach, Attach::Restarted { previous: 1 });
        assert!(!Arc::ptr_eq(&r1, &r2));
        assert_ne!(r1.id(), r2.id());
        assert_eq!(r2.number(), 2);
        assert!(registry.runs().iter().any(|run| Arc::ptr_eq(run, &r1)));
        assert!(Arc::ptr_eq(&registry.for_commit("abc").unwrap(), &r2));
        assert_eq!(r1.snapshot(), before);
    }

    #[test]
    fn test_commits_are_case_sensitive() {
        let (_, registry) = registry();
        let (a, _) = registry.find_or_create("ABC");
        let (b, attach) = registry.find_or_create("abc");

        assert_eq!(attach, Attach::Created);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_runs_are_newest_first() {
        let (_, registry) = registry();
        registry.find_or_create("a");
        registry.find_or_create("b");
        registry.create_detached();

        let numbers: Vec<u64> = registry.runs().iter().map(|run| run.number()).collect();
        assert_eq!(numbers, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_remove_only_unmaps_current_run() {
        let (_, registry) = registry();
        let (r1, _) = registry.find_or_create("abc");
        r1.apply("failed", "").await;
        let (r2, _) = registry.find_or_create("abc");

        registry.remove(r1.number()).unwrap();
        assert!(Arc::ptr_eq(&registry.for_commit("abc").unwrap(), &r2));

        registry.remove(r2.number()).unwrap();
        assert!(registry.for_commit("abc").is_none());
        assert!(registry.is_empty());
        assert!(registry.remove(99).is_none());
    }

    #[test]
    fn test_concurrent_deliveries_share_one_run() {
        let (_, registry) = registry();
        let registry = Arc::new(registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || registry.find_or_create("abc").0.id())
            })
            .collect();
        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert!(ids.iter().all(|id| *id == ids[0]));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_restore_maps_commit_to_newest_run() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        let stored = |number: u64, commit: &str| StoredRun {
            snapshot: RunSnapshot {
                id: uuid::Uuid::new_v4(),
                job: "demo_master".to_string(),
                number,
                commit: Some(commit.to_string()),
                result: Some(RunResult::Success),
                building: false,
                created_at: now,
                started_at: Some(now),
                duration_ms: 1_000,
            },
            log: Vec::new(),
        };

        let registry = RunRegistry::restore(
            "demo_master",
            store,
            vec![stored(4, "abc"), stored(2, "abc"), stored(3, "def")],
            1,
        );

        assert_eq!(registry.for_commit("abc").unwrap().number(), 4);
        assert_eq!(registry.runs()[0].number(), 4);

        let (next, attach) = registry.find_or_create("abc");
        assert_eq!(attach, Attach::Restarted { previous: 4 });
        assert_eq!(next.number(), 5);
    }

    #[test]
    fn test_restore_resumes_above_issued_numbers() {
        let store = Arc::new(MemoryStore::new());

        let registry = RunRegistry::restore("demo_master", store.clone(), Vec::new(), 7);
        assert_eq!(registry.next_number(), 7);
        assert_eq!(registry.find_or_create("abc").0.number(), 7);

        let registry = RunRegistry::restore("demo_master", store, Vec::new(), 0);
        assert_eq!(registry.create_detached().number(), 1);
    }
}
