//! Webhook command handlers
//!
//! Builds pipeline events or replays recorded payloads against the server.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use pipewatch_core::dispatch::derive_job_name;
use pipewatch_core::dto::webhook::PipelineEvent;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::Config;

/// Webhook subcommands
#[derive(Subcommand)]
pub enum WebhookCommands {
    /// Build a pipeline event and send it
    Send {
        /// Project name
        #[arg(long)]
        project: String,

        /// Branch or tag the pipeline ran for
        #[arg(long = "ref")]
        git_ref: String,

        /// Commit sha
        #[arg(long)]
        sha: String,

        /// Pipeline status, e.g. running or success
        #[arg(long)]
        status: String,

        /// Detailed status, e.g. "passed with warnings"
        #[arg(long, default_value = "")]
        detailed_status: String,
    },
    /// Send recorded payloads from a JSON file (one object or an array)
    Replay {
        /// Path to the JSON file
        file: PathBuf,
    },
}

/// Handle webhook commands
pub async fn handle_webhook_command(command: WebhookCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        WebhookCommands::Send {
            project,
            git_ref,
            sha,
            status,
            detailed_status,
        } => {
            let event = PipelineEvent {
                project,
                git_ref,
                sha,
                status,
                detailed_status,
            };
            client.send_pipeline_event(&event).await?;

            println!(
                "{} Sent {} for {} ({})",
                "✓".green(),
                event.status.bold(),
                derive_job_name(&event.project, &event.git_ref).cyan(),
                event.sha.dimmed()
            );
            Ok(())
        }
        WebhookCommands::Replay { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let payloads = replay_payloads(&content)
                .with_context(|| format!("Invalid JSON in {}", file.display()))?;

            for payload in &payloads {
                client.send_webhook(payload).await?;
            }

            println!(
                "{} Replayed {} event(s) from {}",
                "✓".green(),
                payloads.len(),
                file.display()
            );
            Ok(())
        }
    }
}

/// Split a replay file into individual payloads
fn replay_payloads(content: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(content)?;
    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_payloads() {
        assert_eq!(replay_payloads(r#"{"object_kind":"pipeline"}"#).unwrap().len(), 1);
        assert_eq!(replay_payloads(r#"[{"a":1},{"b":2}]"#).unwrap().len(), 2);
        assert!(replay_payloads("not json").is_err());
    }
}
