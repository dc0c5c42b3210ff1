//! Display helpers shared by the command modules

use colored::{ColoredString, Colorize};
use pipewatch_core::domain::log::{LogEntry, LogLevel};
use pipewatch_core::domain::run::RunPhase;
use pipewatch_core::domain::status::RunResult;
use pipewatch_core::estimate::RunProgress;

/// Render milliseconds as `1h 02m 03s`, `2m 05s`, `4.2s` or `N/A` when negative
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "N/A".to_string();
    }

    let total_seconds = ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {:02}s", minutes, seconds)
    } else {
        format!("{}.{}s", seconds, (ms % 1000) / 100)
    }
}

/// Colorize a run result for display
pub fn colorize_result(result: RunResult) -> ColoredString {
    let result_str = result.as_str();
    match result {
        RunResult::Success => result_str.green(),
        RunResult::Unstable => result_str.yellow(),
        RunResult::Failure => result_str.red(),
        RunResult::NotBuilt => result_str.dimmed(),
        RunResult::Aborted => result_str.dimmed(),
    }
}

/// Colorize a run phase for display
pub fn colorize_phase(phase: RunPhase) -> ColoredString {
    match phase {
        RunPhase::Created => "CREATED".yellow(),
        RunPhase::Building => "BUILDING".cyan(),
        RunPhase::Completed(result) => colorize_result(result),
    }
}

/// One-line progress summary of a live run
pub fn describe_progress(progress: &RunProgress) -> String {
    let percent = if progress.progress < 0 {
        "?".to_string()
    } else {
        format!("{}%", progress.progress)
    };
    let remaining = progress
        .remaining_ms
        .map(format_duration)
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "{} elapsed, {} done, {} remaining",
        format_duration(progress.elapsed_ms),
        percent,
        remaining
    )
}

/// Print a log entry
pub fn print_log_entry(log: &LogEntry) {
    let level_str = log.level.as_str().to_uppercase();
    let level_colored = match log.level {
        LogLevel::Debug => level_str.dimmed(),
        LogLevel::Info => level_str.cyan(),
        LogLevel::Warning => level_str.yellow(),
        LogLevel::Error => level_str.red(),
    };

    println!(
        "{} [{}] {}",
        log.timestamp.format("%H:%M:%S").to_string().dimmed(),
        level_colored,
        log.message
    );
}
