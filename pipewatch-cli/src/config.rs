//! Configuration module
//!
//! Handles CLI configuration including the server URL.

use pipewatch_client::PipewatchClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Pipewatch server
    pub server_url: String,
}

impl Config {
    pub fn client(&self) -> PipewatchClient {
        PipewatchClient::new(&self.server_url)
    }
}
