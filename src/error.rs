//! Error types for the export pipeline.
//!
//! Library-level failures are typed so callers can tell a recoverable
//! per-note problem ([`SourceError`]) from a fatal run problem
//! ([`ExportError`]). CLI glue wraps all of these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`NoteSource`](crate::note_source::NoteSource).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The requested note or notebook does not exist (or is no longer readable).
    #[error("not found: {0}")]
    NotFound(String),

    /// A temporary failure (network, rate limiting). Retrying later may succeed.
    #[error("transient source error: {0}")]
    Transient(String),

    /// Anything else the source could not do, e.g. a malformed record.
    #[error("source error: {0}")]
    Other(String),
}

impl SourceError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Fatal failures of an export run.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The output directory could not be created or used.
    #[error("output directory {path:?} is unusable: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Listing a notebook's notes failed; the rest of that notebook is abandoned.
    #[error("listing notebook '{notebook}' failed at offset {offset}: {source}")]
    Listing {
        notebook: String,
        offset: usize,
        #[source]
        source: SourceError,
    },

    /// The notebook list itself could not be retrieved.
    #[error("listing notebooks failed: {0}")]
    Notebooks(#[source] SourceError),

    /// The export window could not be persisted after a run.
    #[error("failed to record export window: {0}")]
    Window(String),
}

/// Configuration values that fail validation at startup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid export start '{value}': expected YYYY-MM-DD HH:MM:SS")]
    InvalidSince { value: String },

    #[error("unknown filename scheme '{0}': expected 'bracketed' or 'underscored'")]
    UnknownScheme(String),

    #[error("{field} must be {requirement}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
    },
}
