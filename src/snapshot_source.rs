//! JSON snapshot note source.
//!
//! Serves notebooks and notes from a local JSON dump so exports can run
//! offline and be reproduced in tests.
//!
//! # Format
//!
//! ```json
//! {
//!   "notebooks": [{ "id": "nb-1", "name": "Trips", "stack": "Home" }],
//!   "notes": [{
//!     "id": "77bd1ddc-ab12",
//!     "notebook_id": "nb-1",
//!     "title": "France",
//!     "created_ms": 1687457368000,
//!     "updated_ms": 1687457368000,
//!     "content": "<en-note>Paris</en-note>",
//!     "tags": ["travel"]
//!   }]
//! }
//! ```
//!
//! A note with `"unavailable": true` is listed but fails to fetch with
//! [`SourceError::NotFound`], which mimics a note deleted mid-run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::path::Path;

use crate::error::SourceError;
use crate::models::{NoteDetail, NoteSummary, Notebook};
use crate::note_source::{filter_by_stack, NoteSource};

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub notebooks: Vec<Notebook>,
    #[serde(default)]
    pub notes: Vec<SnapshotNote>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotNote {
    pub id: String,
    pub notebook_id: String,
    pub title: String,
    pub created_ms: i64,
    pub updated_ms: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub unavailable: bool,
}

/// A [`NoteSource`] over an in-memory [`Snapshot`].
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(mut snapshot: Snapshot) -> Self {
        snapshot
            .notes
            .sort_by(|a, b| a.updated_ms.cmp(&b.updated_ms).then_with(|| a.id.cmp(&b.id)));
        Self { snapshot }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot: {}", path.display()))?;
        let snapshot: Snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse snapshot: {}", path.display()))?;
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl NoteSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    async fn list_notebooks(&self, stack: Option<&str>) -> Result<Vec<Notebook>, SourceError> {
        Ok(filter_by_stack(self.snapshot.notebooks.clone(), stack))
    }

    async fn list_note_summaries(
        &self,
        notebook_id: &str,
        updated_since: i64,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<NoteSummary>, SourceError> {
        if !self.snapshot.notebooks.iter().any(|nb| nb.id == notebook_id) {
            return Err(SourceError::not_found(notebook_id));
        }
        Ok(self
            .snapshot
            .notes
            .iter()
            .filter(|n| n.notebook_id == notebook_id)
            .filter(|n| n.updated_ms.div_euclid(1000) >= updated_since)
            .skip(offset)
            .take(page_size)
            .map(|n| NoteSummary {
                id: n.id.clone(),
                title: n.title.clone(),
                updated_ms: n.updated_ms,
                notebook_id: n.notebook_id.clone(),
            })
            .collect())
    }

    async fn fetch_note_detail(&self, id: &str) -> Result<NoteDetail, SourceError> {
        let note = self
            .snapshot
            .notes
            .iter()
            .find(|n| n.id == id && !n.unavailable)
            .ok_or_else(|| SourceError::not_found(id))?;

        Ok(NoteDetail {
            id: note.id.clone(),
            title: note.title.clone(),
            created: millis_to_utc(note.created_ms)?,
            updated: millis_to_utc(note.updated_ms)?,
            content: note.content.clone(),
            tags: note.tags.clone(),
        })
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>, SourceError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| SourceError::other(format!("timestamp out of range: {}", ms)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        serde_json::from_value(serde_json::json!({
            "notebooks": [
                { "id": "nb1", "name": "Trips", "stack": "Home" },
                { "id": "nb2", "name": "Work" }
            ],
            "notes": [
                { "id": "n2", "notebook_id": "nb1", "title": "Rome", "created_ms": 2000, "updated_ms": 5000 },
                { "id": "n1", "notebook_id": "nb1", "title": "Paris", "created_ms": 1000, "updated_ms": 1000,
                  "content": "<en-note/>", "tags": ["travel"] },
                { "id": "n3", "notebook_id": "nb1", "title": "Gone", "created_ms": 1000, "updated_ms": 9000,
                  "unavailable": true }
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_lists_sorted_pages() {
        let source = SnapshotSource::new(snapshot());
        let page = source.list_note_summaries("nb1", 0, 0, 2).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].title, "Paris");
        assert_eq!(page[1].title, "Rome");
        let rest = source.list_note_summaries("nb1", 0, 2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
    }

    #[tokio::test]
    async fn test_since_hint_applied() {
        let source = SnapshotSource::new(snapshot());
        let page = source.list_note_summaries("nb1", 5, 0, 100).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_note_not_found() {
        let source = SnapshotSource::new(snapshot());
        let err = source.fetch_note_detail("n3").await.unwrap_err();
        assert_eq!(err, SourceError::not_found("n3"));
    }

    #[tokio::test]
    async fn test_fetch_detail() {
        let source = SnapshotSource::new(snapshot());
        let note = source.fetch_note_detail("n1").await.unwrap();
        assert_eq!(note.tags, vec!["travel".to_string()]);
        assert_eq!(note.content, "<en-note/>");
        assert_eq!(note.updated.timestamp(), 1);
    }

    #[tokio::test]
    async fn test_stack_filter_and_unknown_notebook() {
        let source = SnapshotSource::new(snapshot());
        assert_eq!(source.list_notebooks(Some("Home")).await.unwrap().len(), 1);
        assert!(source.list_note_summaries("missing", 0, 0, 10).await.is_err());
    }
}
