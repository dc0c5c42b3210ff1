//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod job;
mod run;
mod webhook;

pub use job::JobCommands;
pub use run::RunCommands;
pub use webhook::WebhookCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Run inspection and submission
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },
    /// Send pipeline events to the server
    Webhook {
        #[command(subcommand)]
        command: WebhookCommands,
    },
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::Run { command } => run::handle_run_command(command, config).await,
        Commands::Webhook { command } => webhook::handle_webhook_command(command, config).await,
    }
}
