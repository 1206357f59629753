//! Schema setup for the checkpoint database.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Export windows, one row per window key
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checkpoints (
            source TEXT PRIMARY KEY,
            cursor TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per completed export run
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS export_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source TEXT NOT NULL,
            started_at INTEGER NOT NULL,
            window_since INTEGER NOT NULL,
            exported INTEGER NOT NULL,
            failed INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_export_runs_source ON export_runs(source)")
        .execute(pool)
        .await?;

    Ok(())
}
