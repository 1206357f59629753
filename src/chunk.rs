//! Paragraph-boundary text chunker with overlap.
//!
//! Splits note text into pieces of at most `chunk_size` characters, packing
//! whole paragraphs (`\n\n`) together where they fit. Consecutive chunks
//! share up to `chunk_overlap` trailing characters of the previous chunk,
//! snapped to a word boundary, so context is not lost at the seams.
//!
//! Each chunk receives a random UUID plus a SHA-256 hash of its text for
//! staleness detection downstream.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split `text` into chunks of at most `chunk_size` characters.
///
/// Empty or whitespace-only text yields no chunks.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let max = chunk_size.max(1);
    let overlap = chunk_overlap.min(max - 1);
    let piece_max = if overlap == 0 {
        max
    } else {
        max.saturating_sub(overlap + 2).max(1)
    };

    let mut chunks: Vec<String> = Vec::new();
    let mut buf = String::new();

    for piece in pieces(text, piece_max) {
        if buf.is_empty() {
            buf.push_str(&piece);
            continue;
        }

        // +2 for the \n\n separator
        if char_len(&buf) + 2 + char_len(&piece) <= max {
            buf.push_str("\n\n");
            buf.push_str(&piece);
            continue;
        }

        let carried = tail(&buf, overlap).to_string();
        chunks.push(std::mem::take(&mut buf));
        if !carried.is_empty() && char_len(&carried) + 2 + char_len(&piece) <= max {
            buf.push_str(&carried);
            buf.push_str("\n\n");
        }
        buf.push_str(&piece);
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    chunks
}

/// Trimmed paragraphs, with any paragraph longer than `max` characters
/// hard-split at the last newline or space before the limit.
fn pieces(text: &str, max: usize) -> Vec<String> {
    let mut out = Vec::new();
    for para in text.split("\n\n") {
        let mut remaining = para.trim();
        while !remaining.is_empty() {
            if char_len(remaining) <= max {
                out.push(remaining.to_string());
                break;
            }
            let limit = byte_index_of_char(remaining, max);
            let split_at = remaining[..limit]
                .rfind('\n')
                .or_else(|| remaining[..limit].rfind(' '))
                .map(|pos| pos + 1)
                .unwrap_or(limit);
            let piece = remaining[..split_at].trim();
            if !piece.is_empty() {
                out.push(piece.to_string());
            }
            remaining = remaining[split_at..].trim_start();
        }
    }
    out
}

/// The last `n` characters of `s`, starting at a word boundary if possible.
fn tail(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let count = char_len(s);
    if count <= n {
        return s;
    }
    let start = byte_index_of_char(s, count - n);
    let at_boundary = s[..start].ends_with(char::is_whitespace);
    let candidate = &s[start..];
    if at_boundary {
        return candidate.trim();
    }
    match candidate.find(char::is_whitespace) {
        Some(pos) => candidate[pos..].trim(),
        None => candidate,
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_index_of_char(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

pub fn make_chunk(
    source: &str,
    notebook: Option<&str>,
    title: Option<&str>,
    index: i64,
    text: &str,
) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        notebook: notebook.map(str::to_string),
        title: title.map(str::to_string),
        chunk_index: index,
        text: text.to_string(),
        hash,
        created: None,
        updated: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_text("Hello, world!", 1000, 100);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 1000, 100).is_empty());
        assert!(split_text(" \n\n  ", 1000, 100).is_empty());
    }

    #[test]
    fn test_paragraphs_packed_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = split_text(text, 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_paragraphs_exceed_limit() {
        let text = "This is paragraph one.\n\nThis is paragraph two.\n\nThis is paragraph three.";
        let chunks = split_text(text, 30, 0);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
    }

    #[test]
    fn test_overlap_carries_last_word() {
        let text = (0..60)
            .map(|i| format!("word{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = split_text(&text, 50, 10);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert!(pair[0].chars().count() <= 50);
            let last = pair[0].split_whitespace().last().unwrap();
            let first = pair[1].split_whitespace().next().unwrap();
            assert_eq!(last, first);
        }
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "é".repeat(500);
        let chunks = split_text(&text, 64, 8);
        assert!(chunks.iter().all(|c| c.chars().count() <= 64));
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_deterministic_hash() {
        let a = make_chunk("f.enex", Some("nb"), Some("t"), 0, "Alpha");
        let b = make_chunk("f.enex", Some("nb"), Some("t"), 0, "Alpha");
        assert_eq!(a.hash, b.hash);
        assert_ne!(a.id, b.id);
    }
}
