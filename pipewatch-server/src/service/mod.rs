//! Service Module
//!
//! Business logic layer for the server.
//! Services work on the in-memory job directory and keep storage in step.

pub mod job;
pub mod run;

// Re-export for convenience
pub use job as job_service;
pub use run as run_service;
