//! `notebridge notebooks` and `notebridge status`.
//!
//! Quick views of what an export would cover and where the export window
//! currently stands.

use anyhow::Result;
use chrono::{TimeZone, Utc};

use crate::checkpoint;
use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::note_source::NoteSource;
use crate::window::SINCE_FORMAT;

/// Print the notebooks an export with `stack` would visit.
pub async fn list_notebooks(source: &dyn NoteSource, stack: Option<&str>) -> Result<()> {
    let notebooks = source.list_notebooks(stack).await?;

    println!("{:<32} {:<16} ID", "NOTEBOOK", "STACK");
    for nb in &notebooks {
        println!(
            "{:<32} {:<16} {}",
            nb.name,
            nb.stack.as_deref().unwrap_or("-"),
            nb.id
        );
    }
    println!("{} notebooks ({})", notebooks.len(), source.name());
    Ok(())
}

/// Print the stored window for `stack` and its most recent runs.
pub async fn show_status(config: &Config, stack: Option<&str>) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;

    let key = checkpoint::window_key(stack);
    let window = checkpoint::get_window(&pool, &key).await?;
    let runs = checkpoint::recent_runs(&pool, &key, 5).await?;
    pool.close().await;

    println!("window {}", key);
    match window {
        Some(w) => println!("  since: {}", w.display()),
        None => println!(
            "  since: {} (no completed run yet)",
            config.initial_window()?.display()
        ),
    }
    if runs.is_empty() {
        return Ok(());
    }
    println!("  recent runs:");
    for run in &runs {
        println!(
            "    {}  from {}  exported {}  failed {}",
            format_ts(run.started_at),
            format_ts(run.window_since),
            run.exported,
            run.failed
        );
    }
    Ok(())
}

fn format_ts(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|t| t.format(SINCE_FORMAT).to_string())
        .unwrap_or_else(|| ts.to_string())
}
