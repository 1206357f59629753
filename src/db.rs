//! SQLite connection for the checkpoint store.
//!
//! Export windows and run history live in one small database file. The CLI
//! performs a single run per invocation, so one connection is enough and
//! keeps the window update serialized.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::config::Config;

/// Open (creating if needed) the checkpoint database at `config.db.path`.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    let path = &config.db.path;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open checkpoint database {}", path.display()))
}
