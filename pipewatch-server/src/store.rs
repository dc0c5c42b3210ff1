//! PostgreSQL Store
//!
//! Backs the engine's persistence collaborators with the repositories.

use async_trait::async_trait;
use pipewatch_core::domain::job::JobDefinition;
use pipewatch_core::domain::log::LogEntry;
use pipewatch_core::domain::run::RunSnapshot;
use pipewatch_core::store::{JobCatalog, RunStore, StoreError, StoredRun};
use sqlx::PgPool;

use crate::repository::{job_repository, log_repository, run_repository};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl RunStore for PgStore {
    async fn save(&self, run: &RunSnapshot, log: &[LogEntry]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        run_repository::upsert(&mut tx, run).await.map_err(backend)?;
        log_repository::replace_entries(&mut tx, run.id, log)
            .await
            .map_err(backend)?;

        tx.commit().await.map_err(backend)?;

        tracing::debug!(
            "Saved run {} #{} with {} log entries",
            run.job,
            run.number,
            log.len()
        );
        Ok(())
    }

    async fn delete(&self, job: &str, number: u64) -> Result<(), StoreError> {
        let deleted = run_repository::delete(&self.pool, job, number)
            .await
            .map_err(backend)?;

        if deleted == 0 {
            // Runs that never completed were never saved
            tracing::debug!("Run {} #{} was not stored", job, number);
        }
        Ok(())
    }

    async fn record_next_number(&self, job: &str, next: u64) -> Result<(), StoreError> {
        let next = i64::try_from(next)
            .map_err(|_| StoreError::Backend(format!("run number {} out of range", next)))?;
        job_repository::raise_next_number(&self.pool, job, next)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl JobCatalog for PgStore {
    async fn create_job(&self, job: &JobDefinition) -> Result<(), StoreError> {
        job_repository::create(&self.pool, job)
            .await
            .map_err(backend)
    }

    async fn delete_job(&self, name: &str) -> Result<bool, StoreError> {
        job_repository::delete(&self.pool, name)
            .await
            .map_err(backend)
    }

    async fn load_jobs(&self) -> Result<Vec<JobDefinition>, StoreError> {
        job_repository::list_all(&self.pool).await.map_err(backend)
    }

    async fn load_runs(&self, job: &str) -> Result<Vec<StoredRun>, StoreError> {
        let snapshots = run_repository::find_by_job(&self.pool, job)
            .await
            .map_err(backend)?;

        let mut runs = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let log = log_repository::find_by_run(&self.pool, snapshot.id)
                .await
                .map_err(backend)?;
            runs.push(StoredRun { snapshot, log });
        }
        Ok(runs)
    }

    async fn load_next_number(&self, job: &str) -> Result<u64, StoreError> {
        let next = job_repository::find_next_number(&self.pool, job)
            .await
            .map_err(backend)?;
        Ok(next.and_then(|n| u64::try_from(n).ok()).unwrap_or(1).max(1))
    }
}
