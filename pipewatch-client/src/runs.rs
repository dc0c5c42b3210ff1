//! Run-related API endpoints

use crate::PipewatchClient;
use crate::error::{ClientError, Result};
use pipewatch_core::domain::job::SubmitRun;
use pipewatch_core::domain::log::LogEntry;
use pipewatch_core::dto::run::RunView;

impl PipewatchClient {
    // =============================================================================
    // Run Inspection
    // =============================================================================

    /// List all runs of a job, newest first
    pub async fn list_runs(&self, job: &str) -> Result<Vec<RunView>> {
        let url = format!("{}/job/{}/runs", self.base_url, job);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a run by number
    pub async fn get_run(&self, job: &str, number: u64) -> Result<RunView> {
        let url = format!("{}/job/{}/run/{}", self.base_url, job, number);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get the run a commit currently maps to
    pub async fn get_run_for_commit(&self, job: &str, sha: &str) -> Result<RunView> {
        let url = format!("{}/job/{}/commit/{}", self.base_url, job, sha);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get the log of a run
    pub async fn get_run_logs(&self, job: &str, number: u64) -> Result<Vec<LogEntry>> {
        let url = format!("{}/job/{}/run/{}/logs", self.base_url, job, number);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Run Management
    // =============================================================================

    /// Delete a run
    pub async fn delete_run(&self, job: &str, number: u64) -> Result<()> {
        let url = format!("{}/job/{}/run/{}", self.base_url, job, number);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Submit a finished run to an external monitor job
    pub async fn submit_run(&self, job: &str, req: SubmitRun) -> Result<RunView> {
        if req.duration_ms < 0 {
            return Err(ClientError::InvalidRequest(format!(
                "duration cannot be negative: {}",
                req.duration_ms
            )));
        }
        req.validate().map_err(ClientError::InvalidRequest)?;

        let url = format!("{}/job/{}/submit", self.base_url, job);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
