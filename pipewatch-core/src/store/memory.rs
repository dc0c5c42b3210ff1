//! In-memory store
//!
//! Implements both collaborator traits on plain maps. Counts calls and can be
//! switched into a failing mode so persistence failures can be exercised
//! without a database.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{JobCatalog, RunStore, StoreError, StoredRun};
use crate::domain::job::JobDefinition;
use crate::domain::log::LogEntry;
use crate::domain::run::RunSnapshot;

#[derive(Debug, Default)]
pub struct MemoryStore {
    jobs: Mutex<BTreeMap<String, JobDefinition>>,
    runs: Mutex<HashMap<(String, u64), StoredRun>>,
    next_numbers: Mutex<HashMap<String, u64>>,
    saves: AtomicUsize,
    deletes: AtomicUsize,
    fail_saves: AtomicBool,
    fail_deletes: AtomicBool,
    fail_catalog: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls received, failed ones included
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls received, failed ones included
    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Make job creation and deletion fail
    pub fn set_fail_catalog(&self, fail: bool) {
        self.fail_catalog.store(fail, Ordering::SeqCst);
    }

    fn check_catalog(&self) -> Result<(), StoreError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated catalog failure".to_string()));
        }
        Ok(())
    }

    /// Stored copy of a run, if any
    pub fn stored_run(&self, job: &str, number: u64) -> Option<StoredRun> {
        let runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.get(&(job.to_string(), number)).cloned()
    }

    pub fn stored_run_count(&self) -> usize {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl RunStore for MemoryStore {
    async fn save(&self, run: &RunSnapshot, log: &[LogEntry]) -> Result<(), StoreError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated save failure".to_string()));
        }

        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.insert(
            (run.job.clone(), run.number),
            StoredRun {
                snapshot: run.clone(),
                log: log.to_vec(),
            },
        );
        Ok(())
    }

    async fn delete(&self, job: &str, number: u64) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated delete failure".to_string()));
        }

        let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        runs.remove(&(job.to_string(), number));
        Ok(())
    }

    async fn record_next_number(&self, job: &str, next: u64) -> Result<(), StoreError> {
        let mut numbers = self
            .next_numbers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let current = numbers.entry(job.to_string()).or_insert(1);
        *current = (*current).max(next);
        Ok(())
    }
}

#[async_trait]
impl JobCatalog for MemoryStore {
    async fn create_job(&self, job: &JobDefinition) -> Result<(), StoreError> {
        self.check_catalog()?;
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        jobs.insert(job.name.clone(), job.clone());
        Ok(())
    }

    async fn delete_job(&self, name: &str) -> Result<bool, StoreError> {
        self.check_catalog()?;
        let removed = {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            jobs.remove(name).is_some()
        };
        if removed {
            let mut runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
            runs.retain(|(job, _), _| job != name);
            self.next_numbers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(name);
        }
        Ok(removed)
    }

    async fn load_jobs(&self) -> Result<Vec<JobDefinition>, StoreError> {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(jobs.values().cloned().collect())
    }

    async fn load_runs(&self, job: &str) -> Result<Vec<StoredRun>, StoreError> {
        let runs = self.runs.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(runs
            .iter()
            .filter(|((name, _), _)| name == job)
            .map(|(_, run)| run.clone())
            .collect())
    }

    async fn load_next_number(&self, job: &str) -> Result<u64, StoreError> {
        let numbers = self
            .next_numbers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(numbers.get(job).copied().unwrap_or(1))
    }
}
