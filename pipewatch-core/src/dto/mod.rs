//! Data Transfer Objects
//!
//! Wire representations shared by the server, the client and the CLI, plus
//! the decoded form of inbound webhook payloads.

pub mod job;
pub mod run;
pub mod webhook;
