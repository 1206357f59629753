//! The note service seam.
//!
//! The export loop never talks to a concrete note service. It is handed a
//! [`NoteSource`] built once per run configuration and borrowed for the
//! duration of the run.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use notebridge::error::SourceError;
//! use notebridge::models::{NoteDetail, NoteSummary, Notebook};
//! use notebridge::note_source::NoteSource;
//!
//! pub struct EmptySource;
//!
//! #[async_trait]
//! impl NoteSource for EmptySource {
//!     fn name(&self) -> &str { "empty" }
//!
//!     async fn list_notebooks(&self, _stack: Option<&str>) -> Result<Vec<Notebook>, SourceError> {
//!         Ok(vec![])
//!     }
//!
//!     async fn list_note_summaries(
//!         &self,
//!         _notebook_id: &str,
//!         _updated_since: i64,
//!         _offset: usize,
//!         _page_size: usize,
//!     ) -> Result<Vec<NoteSummary>, SourceError> {
//!         Ok(vec![])
//!     }
//!
//!     async fn fetch_note_detail(&self, id: &str) -> Result<NoteDetail, SourceError> {
//!         Err(SourceError::not_found(id))
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::SourceError;
use crate::models::{NoteDetail, NoteSummary, Notebook};

/// A paginated note service.
#[async_trait]
pub trait NoteSource: Send + Sync {
    /// Short label used in logs (e.g. `"snapshot"`).
    fn name(&self) -> &str;

    /// List notebooks, keeping only those in `stack` when given.
    async fn list_notebooks(&self, stack: Option<&str>) -> Result<Vec<Notebook>, SourceError>;

    /// Return one page of note summaries for a notebook.
    ///
    /// `updated_since` (Unix seconds) is a hint; callers filter again on
    /// their side. A page shorter than `page_size` is the last one.
    async fn list_note_summaries(
        &self,
        notebook_id: &str,
        updated_since: i64,
        offset: usize,
        page_size: usize,
    ) -> Result<Vec<NoteSummary>, SourceError>;

    /// Fetch a note's full content and tag names.
    async fn fetch_note_detail(&self, id: &str) -> Result<NoteDetail, SourceError>;
}

/// Keep only the notebooks belonging to `stack`; all of them when `None`.
pub fn filter_by_stack(notebooks: Vec<Notebook>, stack: Option<&str>) -> Vec<Notebook> {
    match stack {
        None => notebooks,
        Some(stack) => notebooks
            .into_iter()
            .filter(|nb| nb.stack.as_deref() == Some(stack))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nb(id: &str, stack: Option<&str>) -> Notebook {
        Notebook {
            id: id.to_string(),
            name: id.to_uppercase(),
            stack: stack.map(str::to_string),
        }
    }

    #[test]
    fn test_filter_by_stack() {
        let all = vec![nb("a", Some("Home")), nb("b", None), nb("c", Some("Work"))];
        assert_eq!(filter_by_stack(all.clone(), None).len(), 3);
        let home = filter_by_stack(all, Some("Home"));
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].id, "a");
    }
}
