//! API Module
//!
//! HTTP API layer for the server.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod health;
pub mod job;
pub mod run;
pub mod webhook;

use axum::{
    Router,
    routing::{delete, get, post},
};
use pipewatch_core::directory::JobDirectory;
use pipewatch_core::dispatch::WebhookDispatcher;
use pipewatch_core::store::JobCatalog;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobDirectory>,
    pub catalog: Arc<dyn JobCatalog>,
    pub dispatcher: Arc<WebhookDispatcher>,
    pub default_max_runs: Option<u32>,
}

impl AppState {
    pub fn new(
        jobs: Arc<JobDirectory>,
        catalog: Arc<dyn JobCatalog>,
        default_max_runs: Option<u32>,
    ) -> Self {
        let dispatcher = Arc::new(WebhookDispatcher::new(jobs.clone()));
        Self {
            jobs,
            catalog,
            dispatcher,
            default_max_runs,
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Webhook endpoint
        .route(
            "/gitlab/webhook",
            post(webhook::receive_webhook).fallback(webhook::reject_method),
        )
        // Job endpoints
        .route("/job/create", post(job::create_job))
        .route("/job/list", get(job::list_jobs))
        .route("/job/{name}", get(job::get_job))
        .route("/job/{name}", delete(job::delete_job))
        // Run endpoints
        .route("/job/{name}/runs", get(run::list_runs))
        .route("/job/{name}/run/{number}", get(run::get_run))
        .route("/job/{name}/run/{number}", delete(run::delete_run))
        .route("/job/{name}/run/{number}/logs", get(run::get_run_logs))
        .route("/job/{name}/commit/{sha}", get(run::get_run_for_commit))
        .route("/job/{name}/submit", post(run::submit_run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
