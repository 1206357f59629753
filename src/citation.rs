//! Answer and citation parsing.
//!
//! The question/answer service returns prose optionally followed by the
//! literal marker `SOURCES` and a list of encoded export file names. This
//! module splits the two and decodes the citations back into
//! (notebook, title) pairs for display.
//!
//! Services that can return a structured answer (JSON with explicit
//! `sources`) are preferred; [`Answer::from_response`] only falls back to
//! string parsing when the body is not structured.

use serde::{Deserialize, Serialize};

use crate::filename::{id_suffix, FilenameCodec};
use crate::models::CitationEntry;

/// Marker separating answer prose from its citation block.
pub const SOURCES_MARKER: &str = "SOURCES";

/// An answer split into prose and decoded citations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAnswer {
    pub answer_text: String,
    /// Everything after the first `SOURCES` marker, undecoded.
    pub raw_citations: String,
    pub citations: Vec<CitationEntry>,
}

impl ParsedAnswer {
    /// `"Note: <title> (Notebook: <notebook>), ..."`, or `None` without sources.
    pub fn display_sources(&self) -> Option<String> {
        if self.citations.is_empty() {
            return None;
        }
        Some(
            self.citations
                .iter()
                .map(CitationEntry::display)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}

/// Split `raw` on the first `SOURCES` marker and decode the citations.
///
/// Later occurrences of the marker are left untouched in whichever half
/// they fall.
pub fn parse_answer(raw: &str, codec: &FilenameCodec) -> ParsedAnswer {
    match raw.split_once(SOURCES_MARKER) {
        None => ParsedAnswer {
            answer_text: raw.to_string(),
            ..ParsedAnswer::default()
        },
        Some((answer, block)) => ParsedAnswer {
            answer_text: answer.to_string(),
            raw_citations: block.to_string(),
            citations: codec.decode_all(block),
        },
    }
}

/// Structured answer shape returned by services that report sources
/// explicitly.
#[derive(Debug, Clone, Deserialize)]
struct StructuredAnswer {
    answer: String,
    #[serde(default)]
    sources: Vec<CitationEntry>,
}

/// A service answer, however it arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    /// JSON body with explicit sources.
    Structured(ParsedAnswer),
    /// Plain text whose sources were decoded from encoded file names.
    Decoded(ParsedAnswer),
}

impl Answer {
    pub fn from_response(body: &str, codec: &FilenameCodec) -> Self {
        let trimmed = body.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(structured) = serde_json::from_str::<StructuredAnswer>(trimmed) {
                // Sources may carry the full note guid; keep the same tail
                // that an encoded file name would.
                let citations = structured
                    .sources
                    .into_iter()
                    .map(|mut c| {
                        c.id_suffix = c.id_suffix.as_deref().map(id_suffix);
                        c
                    })
                    .collect();
                return Answer::Structured(ParsedAnswer {
                    answer_text: structured.answer,
                    raw_citations: String::new(),
                    citations,
                });
            }
        }
        Answer::Decoded(parse_answer(body, codec))
    }

    pub fn parsed(&self) -> &ParsedAnswer {
        match self {
            Answer::Structured(p) | Answer::Decoded(p) => p,
        }
    }

    pub fn into_parsed(self) -> ParsedAnswer {
        match self {
            Answer::Structured(p) | Answer::Decoded(p) => p,
        }
    }
}
