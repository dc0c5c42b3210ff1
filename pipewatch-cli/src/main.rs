//! Pipewatch CLI
//!
//! Command-line interface for interacting with the Pipewatch server.

mod commands;
mod config;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "pipewatch")]
#[command(about = "Pipewatch external pipeline monitor CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "PIPEWATCH_SERVER_URL", default_value = "http://localhost:8080")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    handle_command(cli.command, &config).await
}
