//! Job directory
//!
//! Process-wide lookup of jobs by name, rebuilt from storage at startup.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::domain::job::{Job, JobDefinition};
use crate::store::{JobCatalog, RunStore, StoreError};

pub struct JobDirectory {
    jobs: RwLock<HashMap<String, Arc<Job>>>,
    store: Arc<dyn RunStore>,
}

impl JobDirectory {
    pub fn new(store: Arc<dyn RunStore>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Load every job and its runs
    pub async fn load(catalog: &dyn JobCatalog, store: Arc<dyn RunStore>) -> Result<Self, StoreError> {
        let directory = Self::new(store);

        for definition in catalog.load_jobs().await? {
            let runs = catalog.load_runs(&definition.name).await?;
            let next_number = catalog.load_next_number(&definition.name).await?;
            tracing::debug!(
                "Loaded job {} with {} run(s), next run #{}",
                definition.name,
                runs.len(),
                next_number
            );
            let job = Job::restore(definition, directory.store.clone(), runs, next_number);
            directory.insert_job(Arc::new(job));
        }

        tracing::info!("Loaded {} job(s)", directory.len());
        Ok(directory)
    }

    /// Register a new job. Returns `None` if the name is taken.
    pub fn insert(&self, definition: JobDefinition) -> Option<Arc<Job>> {
        let mut jobs = self.jobs.write().unwrap_or_else(PoisonError::into_inner);
        if jobs.contains_key(&definition.name) {
            return None;
        }
        let job = Arc::new(Job::new(definition, self.store.clone()));
        jobs.insert(job.name().to_string(), job.clone());
        Some(job)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All jobs, sorted by name
    pub fn list(&self) -> Vec<Arc<Job>> {
        let mut jobs: Vec<Arc<Job>> = self
            .jobs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.name().cmp(b.name()));
        jobs
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Job>> {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_job(&self, job: Arc<Job>) {
        self.jobs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.name().to_string(), job);
    }
}
