//! Webhook delivery

use crate::PipewatchClient;
use crate::error::{ClientError, Result};
use pipewatch_core::dto::webhook::PipelineEvent;
use serde_json::Value;

impl PipewatchClient {
    /// Post a raw webhook payload, as the CI system would
    ///
    /// The server accepts every well-formed POST, so success only means the
    /// payload was delivered.
    pub async fn send_webhook(&self, payload: &Value) -> Result<()> {
        let url = format!("{}/gitlab/webhook", self.base_url);
        tracing::debug!("Posting webhook to {}", url);
        let response = self.client.post(&url).json(payload).send().await?;

        self.handle_empty_response(response).await
    }

    /// Post a pipeline event
    pub async fn send_pipeline_event(&self, event: &PipelineEvent) -> Result<()> {
        if event.sha.is_empty() {
            return Err(ClientError::InvalidRequest(
                "pipeline event needs a commit sha".to_string(),
            ));
        }

        self.send_webhook(&event.to_value()).await
    }
}
