//! Pipewatch HTTP Client
//!
//! A simple, type-safe HTTP client for the Pipewatch server API.
//!
//! # Example
//!
//! ```no_run
//! use pipewatch_client::PipewatchClient;
//! use pipewatch_core::dto::job::CreateJob;
//! use pipewatch_core::domain::job::JobKind;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = PipewatchClient::new("http://localhost:8080");
//!
//!     let job = client.create_job(CreateJob {
//!         name: "Demo_master".to_string(),
//!         kind: JobKind::Pipeline,
//!         display_name: None,
//!         max_runs: Some(50),
//!     }).await?;
//!
//!     println!("Created job: {}", job.name);
//!     Ok(())
//! }
//! ```

pub mod error;
mod jobs;
mod runs;
mod webhook;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;

/// HTTP client for the Pipewatch server API
///
/// Methods are organized into logical groups:
/// - Job management (create, list, get, delete)
/// - Run inspection, deletion and remote submission
/// - Webhook delivery
#[derive(Debug, Clone)]
pub struct PipewatchClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl PipewatchClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use pipewatch_client::PipewatchClient;
    ///
    /// let client = PipewatchClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the server is up
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_message(&error_text)));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_message(&error_text)));
        }

        Ok(())
    }
}

/// Pull the message out of a `{ "error": ... }` body, or keep the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
