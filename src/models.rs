//! Core data models used throughout notebridge.
//!
//! These types represent the notebooks, notes, exported documents, and
//! citations that flow through the export and answer pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A notebook as listed by the note source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub stack: Option<String>,
}

/// Metadata-only listing record for a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    /// Last update, in milliseconds since the Unix epoch (source precision).
    pub updated_ms: i64,
    pub notebook_id: String,
}

impl NoteSummary {
    /// Last update normalized to whole seconds.
    pub fn updated_secs(&self) -> i64 {
        self.updated_ms.div_euclid(1000)
    }
}

/// A fully fetched note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteDetail {
    pub id: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Raw note markup, carried verbatim into the export.
    pub content: String,
    pub tags: Vec<String>,
}

/// One note ready to be rendered into an `.enex` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub notebook: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub tags: Vec<String>,
    pub content: String,
}

impl ExportedDocument {
    pub fn new(notebook: &Notebook, note: NoteDetail) -> Self {
        Self {
            notebook: notebook.name.clone(),
            title: note.title,
            created: note.created,
            updated: note.updated,
            tags: note.tags,
            content: note.content,
        }
    }
}

/// A (notebook, title) reference decoded from an answer's source list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitationEntry {
    pub notebook: String,
    pub title: String,
    /// Trailing characters of the note id, when the citation carried one.
    #[serde(default, rename = "id")]
    pub id_suffix: Option<String>,
}

impl CitationEntry {
    /// Human-readable form shown under an answer.
    pub fn display(&self) -> String {
        format!("Note: {} (Notebook: {})", self.title, self.notebook)
    }
}

/// Outcome of one export pass.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub exported_count: usize,
    /// Titles of notes whose fetch or write failed.
    pub failed_titles: Vec<String>,
    /// Notebooks whose listing broke off, with the reason.
    pub notebook_errors: Vec<(String, String)>,
    pub written: Vec<PathBuf>,
}

impl ExportReport {
    pub fn failed_count(&self) -> usize {
        self.failed_titles.len()
    }
}

/// A chunk of an exported note's text, ready for embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    /// Encoded file name of the export the chunk came from.
    pub source: String,
    pub notebook: Option<String>,
    pub title: Option<String>,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    /// Note creation time, Unix seconds, for date filtering downstream.
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub updated: Option<i64>,
}
