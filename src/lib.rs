//! # notebridge
//!
//! Glue for retrieval-augmented chat over exported notes.
//!
//! notebridge incrementally exports notes from a paginated note service into
//! `.enex` files, splits those files into chunks for an external embedder,
//! and decodes the source citations that come back inside answers from a
//! question/answer service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ NoteSource  │──▶│ Export loop   │──▶│ .enex files   │──▶ split ──▶ embedder
//! │ (paginated) │   │ window+codec │   │ encoded names │
//! └─────────────┘   └──────┬───────┘   └──────────────┘
//!                          │ checkpoint
//!                          ▼
//!                     ┌─────────┐        ┌──────────────┐
//!                     │ SQLite  │        │ Q&A service  │──▶ citation parser
//!                     └─────────┘        └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! notebridge init                       # create checkpoint database
//! notebridge notebooks                  # what would be exported
//! notebridge export                     # export notes changed since last run
//! notebridge split ./exports -o chunks.jsonl
//! notebridge ask "When did the elbow pain start?" --session chat.json
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`filename`] | Encoded export file names and citation decoding |
//! | [`window`] | Incremental export window |
//! | [`export`] | Paginated note export loop |
//! | [`enex`] | `.enex` rendering and parsing |
//! | [`citation`] | Answer/`SOURCES` splitting |
//! | [`note_source`] | Note service trait |
//! | [`snapshot_source`] | JSON snapshot note source |
//! | [`checkpoint`] | Persisted windows |
//! | [`chunk`] | Text chunking |
//! | [`split`] | `.enex` to JSONL chunks |
//! | [`chat`] | Q&A service client |
//! | [`config`] | TOML configuration |

pub mod chat;
pub mod checkpoint;
pub mod chunk;
pub mod citation;
pub mod config;
pub mod db;
pub mod enex;
pub mod error;
pub mod export;
pub mod filename;
pub mod migrate;
pub mod models;
pub mod note_source;
pub mod progress;
pub mod snapshot_source;
pub mod sources;
pub mod split;
pub mod window;
