//! Incremental note export.
//!
//! Pages through each notebook, keeps notes updated inside the export
//! window, fetches them, and writes one `.enex` file per note under its
//! encoded file name. A note that cannot be fetched or written is recorded
//! and skipped; the run carries on.
//!
//! [`run_export`] wraps the loop with window bookkeeping: the window is read
//! from the checkpoint store, the run start is captured before any paging,
//! and the new window is committed only once the run has completed.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::checkpoint::{self, RunRecord};
use crate::config::Config;
use crate::db;
use crate::enex;
use crate::error::ExportError;
use crate::filename::FilenameCodec;
use crate::migrate;
use crate::models::{ExportReport, ExportedDocument, Notebook};
use crate::note_source::NoteSource;
use crate::progress::{ExportProgressEvent, ExportProgressReporter, NoProgress};
use crate::window::{ExportWindow, WindowTracker};

/// Tunables for one pass of [`export_notes`].
pub struct ExportOptions<'a> {
    pub page_size: usize,
    pub codec: FilenameCodec,
    pub progress: &'a dyn ExportProgressReporter,
}

impl Default for ExportOptions<'_> {
    fn default() -> Self {
        Self {
            page_size: 100,
            codec: FilenameCodec::default(),
            progress: &NoProgress,
        }
    }
}

/// Export every note in `notebooks` updated at or after `window`.
///
/// Returns an error only when the output directory is unusable. Listing
/// failures end the affected notebook and are reported in
/// [`ExportReport::notebook_errors`]; fetch and write failures land in
/// [`ExportReport::failed_titles`].
pub async fn export_notes(
    source: &dyn NoteSource,
    notebooks: &[Notebook],
    output_dir: &Path,
    window: &ExportWindow,
    options: &ExportOptions<'_>,
) -> Result<ExportReport, ExportError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ExportError::OutputDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let page_size = options.page_size.max(1);
    let since = window.timestamp();
    let mut report = ExportReport::default();

    info!(since = %window.display(), notebooks = notebooks.len(), "starting export");

    for (i, notebook) in notebooks.iter().enumerate() {
        options.progress.report(ExportProgressEvent::Notebook {
            name: notebook.name.clone(),
            index: i as u64 + 1,
            total: notebooks.len() as u64,
        });
        info!(notebook = %notebook.name, "processing notebook");

        let mut offset = 0usize;
        let mut exported_in_notebook = 0u64;

        loop {
            let page = match source
                .list_note_summaries(&notebook.id, since, offset, page_size)
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    let err = ExportError::Listing {
                        notebook: notebook.name.clone(),
                        offset,
                        source: e,
                    };
                    warn!(error = %err, "abandoning notebook");
                    report
                        .notebook_errors
                        .push((notebook.name.clone(), err.to_string()));
                    break;
                }
            };

            for summary in &page {
                if !window.includes(summary.updated_secs()) {
                    debug!(title = %summary.title, "not updated since window, skipping");
                    continue;
                }

                let note = match source.fetch_note_detail(&summary.id).await {
                    Ok(note) => note,
                    Err(e) => {
                        warn!(title = %summary.title, error = %e, "failed to retrieve note");
                        record_failure(&mut report, options, notebook, &summary.title);
                        continue;
                    }
                };

                let note_id = note.id.clone();
                let doc = ExportedDocument::new(notebook, note);
                let file_name = options.codec.encode(&doc.notebook, &doc.title, &note_id);
                let path = output_dir.join(&file_name);

                if let Err(e) = write_document(&doc, &path) {
                    warn!(title = %doc.title, path = %path.display(), error = %e, "failed to write note");
                    record_failure(&mut report, options, notebook, &doc.title);
                    continue;
                }

                report.exported_count += 1;
                exported_in_notebook += 1;
                report.written.push(path);
                options.progress.report(ExportProgressEvent::Exported {
                    notebook: notebook.name.clone(),
                    n: exported_in_notebook,
                });
                debug!(title = %doc.title, file = %file_name, "note exported");
            }

            if page.len() < page_size {
                info!(
                    notebook = %notebook.name,
                    exported = exported_in_notebook,
                    "finished notebook"
                );
                break;
            }
            offset += page_size;
        }
    }

    info!(
        exported = report.exported_count,
        failed = report.failed_count(),
        "export completed"
    );
    Ok(report)
}

fn record_failure(
    report: &mut ExportReport,
    options: &ExportOptions<'_>,
    notebook: &Notebook,
    title: &str,
) {
    report.failed_titles.push(title.to_string());
    options.progress.report(ExportProgressEvent::Failed {
        notebook: notebook.name.clone(),
        title: title.to_string(),
    });
}

fn write_document(doc: &ExportedDocument, path: &Path) -> Result<()> {
    let xml = enex::render(doc, &Utc::now())?;
    std::fs::write(path, xml)?;
    Ok(())
}

/// CLI-level overrides for an export run.
#[derive(Debug, Clone, Default)]
pub struct ExportArgs {
    /// Ignore the stored checkpoint and start from the configured window.
    pub full: bool,
    /// Explicit window start, `YYYY-MM-DD HH:MM:SS`. Wins over everything.
    pub since: Option<String>,
    pub stack: Option<String>,
    pub output: Option<PathBuf>,
}

/// Run one export pass with window bookkeeping and print a summary.
pub async fn run_export(
    config: &Config,
    source: &dyn NoteSource,
    args: ExportArgs,
    progress: &dyn ExportProgressReporter,
) -> Result<ExportReport> {
    // Validate everything that can be validated before touching any I/O
    let override_window = args
        .since
        .as_deref()
        .map(|s| ExportWindow::initial(Some(s)))
        .transpose()?;
    let codec = config.export.codec()?;
    let stack = args.stack.or_else(|| config.export.stack_filter.clone());
    let output_dir = args
        .output
        .unwrap_or_else(|| config.export.output_dir.clone());
    let key = checkpoint::window_key(stack.as_deref());

    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;

    let stored = if args.full {
        None
    } else {
        checkpoint::get_window(&pool, &key).await?
    };
    let window = match (override_window, stored) {
        (Some(w), _) => w,
        (None, Some(w)) => w,
        (None, None) => config.initial_window()?,
    };

    let mut tracker = WindowTracker::new(window);
    let run_window = tracker.start_run();
    let started_at = Utc::now().timestamp();

    let notebooks = match source.list_notebooks(stack.as_deref()).await {
        Ok(notebooks) => notebooks,
        Err(e) => {
            tracker.abandon_run();
            pool.close().await;
            return Err(ExportError::Notebooks(e).into());
        }
    };
    info!(source = source.name(), count = notebooks.len(), "notebooks listed");

    let options = ExportOptions {
        page_size: config.export.page_size,
        codec,
        progress,
    };
    let report = match export_notes(source, &notebooks, &output_dir, &run_window, &options).await {
        Ok(report) => report,
        Err(e) => {
            tracker.abandon_run();
            pool.close().await;
            return Err(e.into());
        }
    };

    let next = tracker.advance();
    let run = RunRecord {
        started_at,
        window_since: run_window.timestamp(),
        exported: report.exported_count as i64,
        failed: report.failed_count() as i64,
    };
    checkpoint::commit_window(&pool, &key, &next, &run)
        .await
        .map_err(|e| ExportError::Window(format!("{:#}", e)))
        .context("export finished but the window was not advanced; the next run will repeat it")?;
    pool.close().await;

    println!("export {}", key);
    println!("  notebooks: {}", notebooks.len());
    println!("  exported: {}", report.exported_count);
    println!("  failed: {}", report.failed_count());
    for title in &report.failed_titles {
        println!("    - {}", title);
    }
    for (notebook, reason) in &report.notebook_errors {
        println!("  notebook error: {}: {}", notebook, reason);
    }
    println!("  window: {} -> {}", run_window.display(), next.display());
    println!("ok");

    Ok(report)
}
