//! Job command handlers
//!
//! Handles all job-related CLI commands: creation, listing, details and
//! deletion.

use anyhow::Result;
use clap::{Subcommand, ValueEnum};
use colored::*;
use pipewatch_client::PipewatchClient;
use pipewatch_core::domain::job::JobKind;
use pipewatch_core::dto::job::{CreateJob, JobDetails, JobSummary};

use crate::config::Config;
use crate::types::{colorize_phase, colorize_result, describe_progress, format_duration};

/// How a job receives its runs
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    /// Runs are reported by pipeline webhooks
    Pipeline,
    /// Finished runs are submitted directly
    Monitor,
}

impl From<KindArg> for JobKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Pipeline => JobKind::Pipeline,
            KindArg::Monitor => JobKind::ExternalMonitor,
        }
    }
}

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Create a job
    Create {
        /// Job name, e.g. "MyProject_master" for project MyProject on ref master
        name: String,

        /// How the job receives its runs
        #[arg(long, value_enum, default_value = "pipeline")]
        kind: KindArg,

        /// Human readable name
        #[arg(long)]
        display_name: Option<String>,

        /// Keep at most this many finished runs
        #[arg(long)]
        max_runs: Option<u32>,
    },
    /// List all jobs
    List,
    /// Get job details
    Get {
        /// Job name
        name: String,
    },
    /// Delete a job and all its runs
    Delete {
        /// Job name
        name: String,
    },
}

/// Handle job commands
///
/// Routes job subcommands to their respective handlers.
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = config.client();

    match command {
        JobCommands::Create {
            name,
            kind,
            display_name,
            max_runs,
        } => {
            let req = CreateJob {
                name,
                kind: kind.into(),
                display_name,
                max_runs,
            };
            create_job(&client, req).await
        }
        JobCommands::List => list_jobs(&client).await,
        JobCommands::Get { name } => get_job(&client, &name).await,
        JobCommands::Delete { name } => delete_job(&client, &name).await,
    }
}

/// Create a job
async fn create_job(client: &PipewatchClient, req: CreateJob) -> Result<()> {
    let job = client.create_job(req).await?;

    println!("{} Job {} created", "✓".green(), job.name.bold());
    print_job_summary(&job);

    Ok(())
}

/// List all jobs
async fn list_jobs(client: &PipewatchClient) -> Result<()> {
    let jobs = client.list_jobs().await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

/// Get and display a single job
async fn get_job(client: &PipewatchClient, name: &str) -> Result<()> {
    let job = client.get_job(name).await?;

    print_job_details(&job);

    Ok(())
}

/// Delete a job
async fn delete_job(client: &PipewatchClient, name: &str) -> Result<()> {
    client.delete_job(name).await?;

    println!("{} Job {} deleted", "✓".green(), name.bold());

    Ok(())
}

/// Print a job summary
fn print_job_summary(job: &JobSummary) {
    println!("  {} {}", "▸".cyan(), job.name.bold());
    if let Some(display_name) = &job.display_name {
        println!("    Name:     {}", display_name);
    }
    println!("    Kind:     {}", job.kind.to_string().dimmed());
    println!("    Runs:     {} ({} live)", job.run_count, job.live_runs);
    match job.last_result {
        Some(result) => println!("    Last:     {}", colorize_result(result)),
        None => println!("    Last:     {}", "none".dimmed()),
    }
    println!(
        "    Created:  {}",
        job.created_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!();
}

/// Print detailed job information
fn print_job_details(job: &JobDetails) {
    let summary = &job.summary;

    println!("{}", "Job Details:".bold());
    println!("  Name:        {}", summary.name.cyan());
    if let Some(display_name) = &summary.display_name {
        println!("  Display:     {}", display_name);
    }
    println!("  Kind:        {}", summary.kind);
    println!(
        "  Retention:   {}",
        summary
            .max_runs
            .map(|n| format!("{} runs", n))
            .unwrap_or_else(|| "unlimited".to_string())
    );
    println!("  Runs:        {}", summary.run_count);
    println!(
        "  Estimate:    {}",
        format_duration(job.estimated_duration_ms)
    );
    println!(
        "  Created:     {}",
        summary.created_at.format("%Y-%m-%d %H:%M:%S")
    );

    if job.recent_runs.is_empty() {
        return;
    }

    println!("\n{}", "Recent Runs:".bold());
    for view in &job.recent_runs {
        let run = &view.run;
        let commit = run.commit.as_deref().unwrap_or("-");
        let detail = if run.result.is_none() {
            describe_progress(&view.progress)
        } else {
            format_duration(run.duration_ms)
        };
        let stuck = if view.progress.likely_stuck {
            format!(" {}", "(likely stuck)".red())
        } else {
            String::new()
        };

        println!(
            "  #{:<5} {:<10} {}  {}{}",
            run.number,
            colorize_phase(view.phase),
            commit.dimmed(),
            detail,
            stuck
        );
    }
}
