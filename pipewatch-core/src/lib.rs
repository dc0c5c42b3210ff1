//! Pipewatch Core
//!
//! Reconciliation engine for pipelines executed by an external CI system.
//!
//! This crate contains:
//! - Domain types: status vocabulary, run records, jobs
//! - Registry: per-job commit to run bookkeeping
//! - Estimation: duration, progress and stuck heuristics
//! - Dispatch: routing of inbound webhook events to runs
//! - Store: persistence collaborator traits and an in-memory implementation
//! - DTOs: API payloads shared by the server, client and CLI

pub mod directory;
pub mod dispatch;
pub mod domain;
pub mod dto;
pub mod estimate;
pub mod registry;
pub mod store;

pub use directory::JobDirectory;
pub use dispatch::{DispatchOutcome, WebhookDispatcher, derive_job_name};
pub use domain::job::{Job, JobDefinition, JobKind};
pub use domain::run::{RunPhase, RunRecord, RunSnapshot, Transition};
pub use domain::status::RunResult;
pub use registry::{Attach, RunRegistry};
