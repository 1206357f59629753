//! Persisted export windows.
//!
//! The window committed after each completed run is stored in the
//! `checkpoints` table under a key derived from the stack filter, so an
//! export of one stack never moves the window of another.

use anyhow::{anyhow, Result};
use sqlx::{Row, SqlitePool};

use crate::window::ExportWindow;

/// Checkpoint key for an export restricted to `stack` (or all notebooks).
pub fn window_key(stack: Option<&str>) -> String {
    format!("export:{}", stack.unwrap_or("*"))
}

pub async fn get_window(pool: &SqlitePool, key: &str) -> Result<Option<ExportWindow>> {
    let result: Option<String> =
        sqlx::query_scalar("SELECT cursor FROM checkpoints WHERE source = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;

    let Some(cursor) = result else {
        return Ok(None);
    };
    // A corrupt cursor must not silently restart the window from scratch
    let window = cursor
        .parse::<i64>()
        .ok()
        .and_then(ExportWindow::from_timestamp)
        .ok_or_else(|| anyhow!("checkpoint '{}' holds an invalid window: '{}'", key, cursor))?;
    Ok(Some(window))
}

/// A completed run, as recorded next to its checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub started_at: i64,
    pub window_since: i64,
    pub exported: i64,
    pub failed: i64,
}

/// Store the advanced window and the run that produced it atomically.
pub async fn commit_window(
    pool: &SqlitePool,
    key: &str,
    window: &ExportWindow,
    run: &RunRecord,
) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO checkpoints (source, cursor, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(source) DO UPDATE SET cursor = excluded.cursor, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(window.timestamp().to_string())
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO export_runs (source, started_at, window_since, exported, failed) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(key)
    .bind(run.started_at)
    .bind(run.window_since)
    .bind(run.exported)
    .bind(run.failed)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Most recent runs for `key`, newest first.
pub async fn recent_runs(pool: &SqlitePool, key: &str, limit: i64) -> Result<Vec<RunRecord>> {
    let rows = sqlx::query(
        "SELECT started_at, window_since, exported, failed FROM export_runs \
         WHERE source = ? ORDER BY id DESC LIMIT ?",
    )
    .bind(key)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| RunRecord {
            started_at: row.get("started_at"),
            window_since: row.get("window_since"),
            exported: row.get("exported"),
            failed: row.get("failed"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn pool(tmp: &TempDir) -> SqlitePool {
        let mut config = Config::minimal();
        config.db.path = tmp.path().join("cp.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::create_schema(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_window_key() {
        assert_eq!(window_key(None), "export:*");
        assert_eq!(window_key(Some("Home")), "export:Home");
    }

    #[tokio::test]
    async fn test_missing_checkpoint_is_none() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;
        assert!(get_window(&pool, "export:*").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_and_reload() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;
        let window = ExportWindow::from_timestamp(1_687_457_368).unwrap();
        let run = RunRecord {
            started_at: 1_687_457_368,
            window_since: 0,
            exported: 4,
            failed: 1,
        };
        commit_window(&pool, "export:Home", &window, &run).await.unwrap();

        assert_eq!(get_window(&pool, "export:Home").await.unwrap(), Some(window));
        assert!(get_window(&pool, "export:*").await.unwrap().is_none());

        let runs = recent_runs(&pool, "export:Home", 5).await.unwrap();
        assert_eq!(runs, vec![run]);
    }

    #[tokio::test]
    async fn test_commit_overwrites_cursor() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;
        let run = RunRecord {
            started_at: 0,
            window_since: 0,
            exported: 0,
            failed: 0,
        };
        let first = ExportWindow::from_timestamp(100).unwrap();
        let second = ExportWindow::from_timestamp(200).unwrap();
        commit_window(&pool, "k", &first, &run).await.unwrap();
        commit_window(&pool, "k", &second, &run).await.unwrap();
        assert_eq!(get_window(&pool, "k").await.unwrap(), Some(second));
        assert_eq!(recent_runs(&pool, "k", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_cursor_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let pool = pool(&tmp).await;
        sqlx::query("INSERT INTO checkpoints (source, cursor, updated_at) VALUES (?, ?, ?)")
            .bind("export:*")
            .bind("yesterday")
            .bind(0i64)
            .execute(&pool)
            .await
            .unwrap();

        let err = get_window(&pool, "export:*").await.unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }
}
