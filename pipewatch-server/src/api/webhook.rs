//! Webhook API Handlers
//!
//! Receives pipeline events from the CI system. The sender always gets a
//! success answer; every problem is logged and swallowed.

use axum::{body::Bytes, extract::State, http::StatusCode};
use pipewatch_core::dispatch::DispatchOutcome;
use serde_json::Value;

use crate::api::AppState;

/// POST /gitlab/webhook
/// Apply a pipeline event to its run
pub async fn receive_webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!("Ignoring webhook with undecodable body: {}", err);
            return StatusCode::OK;
        }
    };

    match state.dispatcher.dispatch(&payload).await {
        DispatchOutcome::Applied {
            job,
            number,
            transition,
            ..
        } => {
            tracing::debug!("Webhook applied to {} #{}: {:?}", job, number, transition);
        }
        outcome => {
            tracing::debug!("Webhook not applied: {:?}", outcome);
        }
    }

    StatusCode::OK
}

/// Any other method on /gitlab/webhook
pub async fn reject_method() -> StatusCode {
    StatusCode::FORBIDDEN
}
