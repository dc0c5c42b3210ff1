//! Run Repository
//!
//! Handles all database operations related to run records.

use pipewatch_core::domain::run::RunSnapshot;
use pipewatch_core::domain::status::RunResult;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Insert a run, or update the mutable fields of an existing one
pub async fn upsert(conn: &mut PgConnection, run: &RunSnapshot) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO runs (id, job_name, number, commit_sha, result, building,
                          created_at, started_at, duration_ms)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (id) DO UPDATE
        SET result = EXCLUDED.result,
            building = EXCLUDED.building,
            started_at = EXCLUDED.started_at,
            duration_ms = EXCLUDED.duration_ms
        "#,
    )
    .bind(run.id)
    .bind(&run.job)
    .bind(run.number as i64)
    .bind(&run.commit)
    .bind(run.result.map(RunResult::as_str))
    .bind(run.building)
    .bind(run.created_at)
    .bind(run.started_at)
    .bind(run.duration_ms)
    .execute(conn)
    .await?;

    Ok(())
}

/// All runs of a job, oldest first
pub async fn find_by_job(pool: &PgPool, job: &str) -> Result<Vec<RunSnapshot>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, job_name, number, commit_sha, result, building,
               created_at, started_at, duration_ms
        FROM runs
        WHERE job_name = $1
        ORDER BY number ASC
        "#,
    )
    .bind(job)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Delete a run. Its logs go with it.
pub async fn delete(pool: &PgPool, job: &str, number: u64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM runs WHERE job_name = $1 AND number = $2")
        .bind(job)
        .bind(number as i64)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    job_name: String,
    number: i64,
    commit_sha: Option<String>,
    result: Option<String>,
    building: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    duration_ms: i64,
}

impl From<RunRow> for RunSnapshot {
    fn from(row: RunRow) -> Self {
        let result = row.result.as_deref().and_then(|s| {
            let parsed = RunResult::parse(s);
            if parsed.is_none() {
                tracing::warn!("Run {} has unknown result {}", row.id, s);
            }
            parsed
        });

        RunSnapshot {
            id: row.id,
            job: row.job_name,
            number: row.number.max(0) as u64,
            commit: row.commit_sha,
            result,
            building: row.building,
            created_at: row.created_at,
            started_at: row.started_at,
            duration_ms: row.duration_ms,
        }
    }
}
