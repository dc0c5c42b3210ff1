//! Job Repository
//!
//! Handles all database operations related to job definitions.

use pipewatch_core::domain::job::{JobDefinition, JobKind};
use sqlx::PgPool;

/// Insert a new job definition
pub async fn create(pool: &PgPool, job: &JobDefinition) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO jobs (name, kind, display_name, max_runs, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(&job.name)
    .bind(job.kind.as_str())
    .bind(&job.display_name)
    .bind(job.max_runs.map(|n| n as i32))
    .bind(job.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// List all jobs
pub async fn list_all(pool: &PgPool) -> Result<Vec<JobDefinition>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(
        r#"
        SELECT name, kind, display_name, max_runs, created_at
        FROM jobs
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a job. Its runs and logs go with it.
pub async fn delete(pool: &PgPool, name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM jobs WHERE name = $1")
        .bind(name)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Raise the job's next run number, never lowering it
pub async fn raise_next_number(pool: &PgPool, name: &str, next: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE jobs SET next_number = GREATEST(next_number, $2) WHERE name = $1")
        .bind(name)
        .bind(next)
        .execute(pool)
        .await?;

    Ok(())
}

/// Stored next run number of a job
pub async fn find_next_number(pool: &PgPool, name: &str) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT next_number FROM jobs WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    name: String,
    kind: String,
    display_name: Option<String>,
    max_runs: Option<i32>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<JobRow> for JobDefinition {
    fn from(row: JobRow) -> Self {
        let kind = JobKind::parse(&row.kind).unwrap_or_else(|| {
            tracing::warn!("Job {} has unknown kind {}, treating as Pipeline", row.name, row.kind);
            JobKind::Pipeline
        });

        JobDefinition {
            name: row.name,
            kind,
            display_name: row.display_name,
            max_runs: row.max_runs.and_then(|n| u32::try_from(n).ok()),
            created_at: row.created_at,
        }
    }
}
