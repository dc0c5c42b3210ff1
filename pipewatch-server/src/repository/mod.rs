//! Repository Module
//!
//! Data access layer for the server.
//! Each repository handles database operations for a specific table.

pub mod job;
pub mod log;
pub mod run;

// Re-export for convenience
pub use job as job_repository;
pub use log as log_repository;
pub use run as run_repository;
