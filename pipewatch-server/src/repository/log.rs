//! Log Repository
//!
//! Handles all database operations related to run logs.

use pipewatch_core::domain::log::{LogEntry, LogLevel};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Replace the stored log of a run
pub async fn replace_entries(
    conn: &mut PgConnection,
    run_id: Uuid,
    entries: &[LogEntry],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM run_logs WHERE run_id = $1")
        .bind(run_id)
        .execute(&mut *conn)
        .await?;

    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO run_logs (run_id, timestamp, level, message)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(run_id)
        .bind(entry.timestamp)
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Get all log entries for a run, in insertion order
pub async fn find_by_run(pool: &PgPool, run_id: Uuid) -> Result<Vec<LogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, LogRow>(
        r#"
        SELECT timestamp, level, message
        FROM run_logs
        WHERE run_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LogRow {
    timestamp: chrono::DateTime<chrono::Utc>,
    level: String,
    message: String,
}

impl From<LogRow> for LogEntry {
    fn from(row: LogRow) -> Self {
        LogEntry {
            timestamp: row.timestamp,
            level: LogLevel::parse(&row.level),
            message: row.message,
        }
    }
}
