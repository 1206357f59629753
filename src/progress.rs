//! Export progress reporting.
//!
//! Reports what `notebridge export` is doing so users can follow a long
//! export. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event for an export run.
#[derive(Clone, Debug)]
pub enum ExportProgressEvent {
    /// Started paging through a notebook.
    Notebook { name: String, index: u64, total: u64 },
    /// A note was written.
    Exported { notebook: String, n: u64 },
    /// A note could not be fetched or written.
    Failed { notebook: String, title: String },
}

/// Reports export progress. Implementations write to stderr (human or JSON).
pub trait ExportProgressReporter: Send + Sync {
    fn report(&self, event: ExportProgressEvent);
}

/// Human-friendly progress on stderr: "export Trips  1,234 notes".
pub struct StderrProgress;

impl ExportProgressReporter for StderrProgress {
    fn report(&self, event: ExportProgressEvent) {
        let line = match &event {
            ExportProgressEvent::Notebook { name, index, total } => {
                format!("export {}  notebook {} / {}\n", name, index, total)
            }
            ExportProgressEvent::Exported { notebook, n } => {
                format!("export {}  {} notes\n", notebook, format_number(*n))
            }
            ExportProgressEvent::Failed { notebook, title } => {
                format!("export {}  failed: {}\n", notebook, title)
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ExportProgressReporter for JsonProgress {
    fn report(&self, event: ExportProgressEvent) {
        let obj = match &event {
            ExportProgressEvent::Notebook { name, index, total } => serde_json::json!({
                "event": "progress",
                "phase": "notebook",
                "notebook": name,
                "index": index,
                "total": total
            }),
            ExportProgressEvent::Exported { notebook, n } => serde_json::json!({
                "event": "progress",
                "phase": "exported",
                "notebook": notebook,
                "n": n
            }),
            ExportProgressEvent::Failed { notebook, title } => serde_json::json!({
                "event": "progress",
                "phase": "failed",
                "notebook": notebook,
                "title": title
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let mut stderr = std::io::stderr().lock();
            let _ = writeln!(stderr, "{}", line);
            let _ = stderr.flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ExportProgressReporter for NoProgress {
    fn report(&self, _event: ExportProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ExportProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
