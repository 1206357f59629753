//! TOML configuration.
//!
//! Every value is validated when the file is loaded, so a bad export start
//! or page size fails before any export I/O begins.
//!
//! ```toml
//! [db]
//! path = "./data/notebridge.sqlite"
//!
//! [export]
//! output_dir = "./exports"
//! since = "2023-06-01 12:00:00"   # optional
//! stack_filter = "Home"           # optional
//! page_size = 100
//! scheme = "bracketed"            # or "underscored"
//!
//! [source]
//! snapshot = "./notes.json"
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 100
//!
//! [chat]
//! endpoint = "http://127.0.0.1:9898/evernotechatbot"
//! timeout_secs = 60
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::filename::{FilenameCodec, FilenameScheme};
use crate::window::ExportWindow;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub export: ExportConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
    /// First export start, `YYYY-MM-DD HH:MM:SS`. Everything when unset.
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub stack_filter: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

fn default_page_size() -> usize {
    100
}
fn default_scheme() -> String {
    "bracketed".to_string()
}

impl ExportConfig {
    pub fn codec(&self) -> Result<FilenameCodec> {
        let scheme: FilenameScheme = self.scheme.parse()?;
        Ok(FilenameCodec::new(scheme))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourceConfig {
    /// JSON snapshot served by the snapshot note source.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// A configuration with no file behind it, for commands that only
    /// decode text (e.g. `notebridge parse`).
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/notebridge.sqlite"),
            },
            export: ExportConfig {
                output_dir: PathBuf::from("./exports"),
                since: None,
                stack_filter: None,
                page_size: default_page_size(),
                scheme: default_scheme(),
            },
            source: SourceConfig::default(),
            chunking: ChunkingConfig::default(),
            chat: ChatConfig::default(),
        }
    }

    /// The window to use when no checkpoint has been recorded yet.
    pub fn initial_window(&self) -> Result<ExportWindow> {
        Ok(ExportWindow::initial(self.export.since.as_deref())?)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate export
    if config.export.page_size == 0 {
        return Err(out_of_range("export.page_size", "> 0"));
    }
    config.export.codec().context("export.scheme")?;
    config.initial_window().context("export.since")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        return Err(out_of_range("chunking.chunk_size", "> 0"));
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        return Err(out_of_range(
            "chunking.chunk_overlap",
            "smaller than chunking.chunk_size",
        ));
    }

    // Validate chat
    if config.chat.timeout_secs == 0 {
        return Err(out_of_range("chat.timeout_secs", "> 0"));
    }
    if let Some(endpoint) = &config.chat.endpoint {
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            bail!("chat.endpoint must be an http(s) URL, got '{}'", endpoint);
        }
    }

    Ok(())
}

fn out_of_range(field: &'static str, requirement: &'static str) -> anyhow::Error {
    ConfigError::OutOfRange { field, requirement }.into()
}
