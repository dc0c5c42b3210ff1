//! Job-related API endpoints

use crate::PipewatchClient;
use crate::error::Result;
use pipewatch_core::dto::job::{CreateJob, JobDetails, JobSummary};

impl PipewatchClient {
    /// Create a job
    ///
    /// Fails with status 409 when the name is taken and 400 when it is invalid.
    pub async fn create_job(&self, req: CreateJob) -> Result<JobSummary> {
        let url = format!("{}/job/create", self.base_url);
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List all jobs, sorted by name
    pub async fn list_jobs(&self) -> Result<Vec<JobSummary>> {
        let url = format!("{}/job/list", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a job with its duration estimate and recent runs
    pub async fn get_job(&self, name: &str) -> Result<JobDetails> {
        let url = format!("{}/job/{}", self.base_url, name);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Delete a job and all its runs
    pub async fn delete_job(&self, name: &str) -> Result<()> {
        let url = format!("{}/job/{}", self.base_url, name);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
