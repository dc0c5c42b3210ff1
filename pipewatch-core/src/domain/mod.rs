//! Core domain types
//!
//! Shared between the server (for persistence and the API) and the client
//! and CLI (for decoding responses).

pub mod job;
pub mod log;
pub mod run;
pub mod status;
