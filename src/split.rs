//! Split exported `.enex` files into embedding-ready chunks.
//!
//! Each file is parsed, its note content flattened to plain text, and the
//! text chunked with the configured size and overlap. Every chunk keeps the
//! file's encoded name as its `source`, which is what the answer service
//! later cites and the citation parser decodes.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunk::{make_chunk, split_text};
use crate::config::ChunkingConfig;
use crate::enex;
use crate::filename::FilenameCodec;
use crate::models::Chunk;

/// Expand files and directories into a sorted list of `.enex` files.
pub fn collect_enex_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let include = build_globset(&["**/*.enex".to_string()])?;
    let mut files = Vec::new();

    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
            continue;
        }
        if !input.is_dir() {
            anyhow::bail!("input does not exist: {}", input.display());
        }
        for entry in WalkDir::new(input) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(input).unwrap_or(entry.path());
            if include.is_match(relative) {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Chunk one `.enex` file.
pub fn split_file(path: &Path, chunking: &ChunkingConfig, codec: &FilenameCodec) -> Result<Vec<Chunk>> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let note = enex::parse(&xml).with_context(|| format!("Failed to parse {}", path.display()))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let decoded = codec.decode(&file_name);
    let notebook = decoded.as_ref().map(|c| c.notebook.as_str());
    let title = decoded
        .as_ref()
        .map(|c| c.title.as_str())
        .unwrap_or(note.title.as_str());

    let text = enex::enml_to_text(&note.content);
    let created = note.created.map(|t| t.timestamp());
    let updated = note.updated.map(|t| t.timestamp());
    Ok(split_text(&text, chunking.chunk_size, chunking.chunk_overlap)
        .iter()
        .enumerate()
        .map(|(i, piece)| Chunk {
            created,
            updated,
            ..make_chunk(&file_name, notebook, Some(title), i as i64, piece)
        })
        .collect())
}

/// Handle `notebridge split`: write one JSON chunk per line.
///
/// Unreadable files are skipped with a warning. Writes to `output` when
/// given, otherwise to stdout for piping into an embedder.
pub fn run_split(
    inputs: &[PathBuf],
    output: Option<&Path>,
    chunking: &ChunkingConfig,
    codec: &FilenameCodec,
) -> Result<usize> {
    let files = collect_enex_files(inputs)?;
    let mut sink: Box<dyn Write> = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Box::new(std::io::BufWriter::new(std::fs::File::create(path)?))
        }
        None => Box::new(std::io::stdout().lock()),
    };

    let mut total = 0usize;
    let mut skipped = 0usize;
    for file in &files {
        let chunks = match split_file(file, chunking, codec) {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!(file = %file.display(), error = %format!("{:#}", e), "skipping file");
                skipped += 1;
                continue;
            }
        };
        for chunk in &chunks {
            writeln!(sink, "{}", serde_json::to_string(chunk)?)?;
        }
        total += chunks.len();
    }
    sink.flush()?;

    info!(files = files.len(), skipped, chunks = total, "split completed");
    if let Some(path) = output {
        eprintln!(
            "Split {} files into {} chunks ({} skipped) -> {}",
            files.len() - skipped,
            total,
            skipped,
            path.display()
        );
    }
    Ok(total)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
