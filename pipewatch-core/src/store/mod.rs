//! Persistence collaborators
//!
//! The engine never talks to storage directly. Hosts inject these traits as
//! `Arc<dyn ...>`: the server backs them with PostgreSQL, tests with
//! [`MemoryStore`].

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::job::JobDefinition;
use crate::domain::log::LogEntry;
use crate::domain::run::RunSnapshot;

/// Errors reported by storage collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed (I/O, database, ...)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// The operation was interrupted before it completed
    #[error("storage operation interrupted")]
    Interrupted,

    /// The referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// A persisted run together with its log
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub snapshot: RunSnapshot,
    pub log: Vec<LogEntry>,
}

/// Durable storage for run records
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persist the run and replace its stored log
    async fn save(&self, run: &RunSnapshot, log: &[LogEntry]) -> Result<(), StoreError>;

    /// Remove a run and its log
    async fn delete(&self, job: &str, number: u64) -> Result<(), StoreError>;

    /// Remember that every number below `next` has been issued for `job`.
    ///
    /// The stored value only ever grows.
    async fn record_next_number(&self, job: &str, next: u64) -> Result<(), StoreError>;
}

/// Durable storage for job definitions, used at startup and by job management
#[async_trait]
pub trait JobCatalog: Send + Sync {
    async fn create_job(&self, job: &JobDefinition) -> Result<(), StoreError>;

    /// Returns false when no such job was stored
    async fn delete_job(&self, name: &str) -> Result<bool, StoreError>;

    async fn load_jobs(&self) -> Result<Vec<JobDefinition>, StoreError>;

    /// All stored runs of a job, in any order
    async fn load_runs(&self, job: &str) -> Result<Vec<StoredRun>, StoreError>;

    /// Lowest number never issued for a job, 1 when nothing was recorded
    async fn load_next_number(&self, job: &str) -> Result<u64, StoreError>;
}
