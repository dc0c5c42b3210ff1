//! Run command handlers
//!
//! Handles run inspection, deletion, logs and remote result submission.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use pipewatch_client::PipewatchClient;
use pipewatch_core::domain::job::SubmitRun;
use pipewatch_core::domain::status::RunResult;
use pipewatch_core::dto::run::RunView;
use std::path::PathBuf;

use crate::config::Config;
use crate::types::{colorize_phase, describe_progress, format_duration, print_log_entry};

/// Run subcommands
#[derive(Subcommand)]
pub enum RunCommands {
    /// List all runs of a job
    List {
        /// Job name
        job: String,
    },
    /// Get run details
    Get {
        /// Job name
        job: String,
        /// Run number
        number: u64,
    },
    /// Get run logs
    Logs {
        /// Job name
        job: String,
        /// Run number
        number: u64,
    },
    /// Delete a run
    Delete {
        /// Job name
        job: String,
        /// Run number
        number: u64,
    },
    /// Show the run a commit maps to
    Commit {
        /// Job name
        job: String,
        /// Commit sha
        sha: String,
    },
    /// Submit a finished run to an external monitor job
    Submit {
        /// Job name
        job: String,

        /// Result: SUCCESS, UNSTABLE, FAILURE, NOT_BUILT or ABORTED
        #[arg(long, value_parser = parse_result)]
        result: RunResult,

        /// Duration in milliseconds
        #[arg(long)]
        duration_ms: i64,

        /// Log line to attach (repeatable)
        #[arg(long = "log")]
        log: Vec<String>,

        /// File whose lines are attached to the log
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

fn parse_result(s: &str) -> Result<RunResult, String> {
    RunResult::parse(&s.to_uppercase()).ok_or_else(|| format!("unknown result '{}'", s))
}

/// Handle run commands
///
/// Routes run subcommands to their respective handlers.
pub async fn handle_run_command(command: RunCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        RunCommands::List { job } => list_runs(&client, &job).await,
        RunCommands::Get { job, number } => get_run(&client, &job, number).await,
        RunCommands::Logs { job, number } => get_run_logs(&client, &job, number).await,
        RunCommands::Delete { job, number } => delete_run(&client, &job, number).await,
        RunCommands::Commit { job, sha } => get_run_for_commit(&client, &job, &sha).await,
        RunCommands::Submit {
            job,
            result,
            duration_ms,
            mut log,
            log_file,
        } => {
            if let Some(path) = log_file {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read log file {}", path.display()))?;
                log.extend(content.lines().map(str::to_string));
            }
            let req = SubmitRun {
                result,
                duration_ms,
                log,
            };
            submit_run(&client, &job, req).await
        }
    }
}

/// List all runs of a job
async fn list_runs(client: &PipewatchClient, job: &str) -> Result<()> {
    let runs = client.list_runs(job).await?;

    if runs.is_empty() {
        println!("{}", format!("No runs found for job {}.", job).yellow());
    } else {
        println!(
            "{}",
            format!("Found {} run(s) for job {}:", runs.len(), job).bold()
        );
        println!();
        for run in runs {
            print_run_summary(&run);
        }
    }

    Ok(())
}

/// Get and display a single run
async fn get_run(client: &PipewatchClient, job: &str, number: u64) -> Result<()> {
    let run = client.get_run(job, number).await?;

    print_run_details(&run);

    Ok(())
}

/// Get and display the run a commit maps to
async fn get_run_for_commit(client: &PipewatchClient, job: &str, sha: &str) -> Result<()> {
    let run = client.get_run_for_commit(job, sha).await?;

    print_run_details(&run);

    Ok(())
}

/// Get and display run logs
async fn get_run_logs(client: &PipewatchClient, job: &str, number: u64) -> Result<()> {
    let logs = client.get_run_logs(job, number).await?;

    if logs.is_empty() {
        println!("{}", "No logs found for this run.".yellow());
    } else {
        println!("{}", format!("Logs for run {} #{}:", job, number).bold());
        println!("{}", "─".repeat(80).dimmed());
        for log in logs {
            print_log_entry(&log);
        }
        println!("{}", "─".repeat(80).dimmed());
    }

    Ok(())
}

/// Delete a run
async fn delete_run(client: &PipewatchClient, job: &str, number: u64) -> Result<()> {
    client.delete_run(job, number).await?;

    println!("{} Run {} #{} deleted", "✓".green(), job.bold(), number);

    Ok(())
}

/// Submit a finished run
async fn submit_run(client: &PipewatchClient, job: &str, req: SubmitRun) -> Result<()> {
    let run = client.submit_run(job, req).await?;

    println!(
        "{} Run {} #{} recorded",
        "✓".green(),
        job.bold(),
        run.run.number
    );
    print_run_details(&run);

    Ok(())
}

/// Print a run summary line
fn print_run_summary(view: &RunView) {
    let run = &view.run;

    println!(
        "  {} #{} {}",
        "▸".cyan(),
        run.number,
        colorize_phase(view.phase)
    );
    if let Some(commit) = &run.commit {
        println!("    Commit:   {}", commit.dimmed());
    }
    if run.result.is_some() {
        println!("    Duration: {}", format_duration(run.duration_ms));
    } else {
        println!("    Progress: {}", describe_progress(&view.progress));
    }
    println!();
}

/// Print detailed run information
fn print_run_details(view: &RunView) {
    let run = &view.run;

    println!("{}", "Run Details:".bold());
    println!("  Job:       {}", run.job.cyan());
    println!("  Number:    #{}", run.number);
    println!("  ID:        {}", run.id.to_string().dimmed());
    println!("  Phase:     {}", colorize_phase(view.phase));
    if let Some(commit) = &run.commit {
        println!("  Commit:    {}", commit);
    }
    println!(
        "  Created:   {}",
        run.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Started:   {}",
        run.start_time().format("%Y-%m-%d %H:%M:%S")
    );

    if run.result.is_some() {
        println!("  Duration:  {}", format_duration(run.duration_ms));
        return;
    }

    println!("  Progress:  {}", describe_progress(&view.progress));
    println!(
        "  Estimate:  {}",
        format_duration(view.progress.estimated_duration_ms)
    );
    if view.progress.likely_stuck {
        println!("  {}", "This run looks stuck.".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_result_is_case_insensitive() {
        assert_eq!(parse_result("success"), Ok(RunResult::Success));
        assert_eq!(parse_result("NOT_BUILT"), Ok(RunResult::NotBuilt));
        assert!(parse_result("passed").is_err());
    }
}
