use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::config::Config;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            name VARCHAR(255) PRIMARY KEY,
            kind VARCHAR(50) NOT NULL,
            display_name TEXT,
            max_runs INTEGER,
            created_at TIMESTAMPTZ NOT NULL,
            next_number BIGINT NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("ALTER TABLE jobs ADD COLUMN IF NOT EXISTS next_number BIGINT NOT NULL DEFAULT 1")
        .execute(pool)
        .await?;

    // Create runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runs (
            id UUID PRIMARY KEY,
            job_name VARCHAR(255) NOT NULL REFERENCES jobs(name) ON DELETE CASCADE,
            number BIGINT NOT NULL,
            commit_sha VARCHAR(255),
            result VARCHAR(20),
            building BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            duration_ms BIGINT NOT NULL DEFAULT 0,
            UNIQUE (job_name, number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create run logs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS run_logs (
            id SERIAL PRIMARY KEY,
            run_id UUID NOT NULL REFERENCES runs(id) ON DELETE CASCADE,
            timestamp TIMESTAMPTZ NOT NULL,
            level VARCHAR(20) NOT NULL,
            message TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_job_number ON runs(job_name, number DESC)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runs_job_commit ON runs(job_name, commit_sha)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_run_logs_run_id ON run_logs(run_id, timestamp)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
