//! Webhook dispatch
//!
//! Routes an inbound pipeline event to the run it describes. Nothing in here
//! fails outward: every problem becomes a [`DispatchOutcome`] that is logged
//! and otherwise swallowed, so the sender always sees its delivery accepted.

use serde_json::Value;
use std::sync::Arc;

use crate::directory::JobDirectory;
use crate::domain::job::JobKind;
use crate::domain::run::Transition;
use crate::dto::webhook::{EventError, PipelineEvent};
use crate::registry::Attach;

/// Derive the local job name for a project and ref.
///
/// Joins both with `_` and replaces every character outside
/// `[A-Za-z0-9_-]` with `_`. Total and deterministic.
pub fn derive_job_name(project: &str, git_ref: &str) -> String {
    format!("{}_{}", project, git_ref)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// What happened to an inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a usable pipeline event
    Rejected(EventError),
    /// No job with the derived name
    JobNotFound(String),
    /// The job exists but is not fed by webhooks
    WrongKind { job: String, kind: JobKind },
    /// The event reached a run
    Applied {
        job: String,
        number: u64,
        attach: Attach,
        transition: Transition,
    },
}

pub struct WebhookDispatcher {
    jobs: Arc<JobDirectory>,
}

impl WebhookDispatcher {
    pub fn new(jobs: Arc<JobDirectory>) -> Self {
        Self { jobs }
    }

    pub fn jobs(&self) -> &Arc<JobDirectory> {
        &self.jobs
    }

    /// Handle one decoded webhook payload
    pub async fn dispatch(&self, payload: &Value) -> DispatchOutcome {
        let event = match PipelineEvent::from_value(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!("Ignoring webhook event: {}", err);
                return DispatchOutcome::Rejected(err);
            }
        };

        self.dispatch_event(&event).await
    }

    /// Handle an already decoded pipeline event
    pub async fn dispatch_event(&self, event: &PipelineEvent) -> DispatchOutcome {
        let name = derive_job_name(&event.project, &event.git_ref);

        let Some(job) = self.jobs.get(&name) else {
            tracing::warn!(
                "No job {} for project {} ref {}, event dropped",
                name,
                event.project,
                event.git_ref
            );
            return DispatchOutcome::JobNotFound(name);
        };

        if job.kind() != JobKind::Pipeline {
            tracing::warn!(
                "Job {} is a {} job, pipeline event dropped",
                name,
                job.kind()
            );
            return DispatchOutcome::WrongKind {
                job: name,
                kind: job.kind(),
            };
        }

        tracing::info!(
            "Pipeline event for {} commit {}: {} ({})",
            name,
            event.sha,
            event.status,
            event.detailed_status
        );

        let (run, attach) = job.registry().find_or_create(&event.sha);
        if attach != Attach::Existing {
            job.record_issued_numbers().await;
        }
        let transition = run.apply(&event.status, &event.detailed_status).await;

        if transition.is_completed() {
            job.rotate_after_completion().await;
        }

        DispatchOutcome::Applied {
            job: name,
            number: run.number(),
            attach,
            transition,
        }
    }
}
