//! # notebridge CLI
//!
//! The `notebridge` binary drives the export pipeline and the answer-side
//! helpers.
//!
//! ## Usage
//!
//! ```bash
//! notebridge --config ./config/notebridge.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `notebridge init` | Create the checkpoint database |
//! | `notebridge notebooks` | List the notebooks an export would visit |
//! | `notebridge status` | Show the stored export window and recent runs |
//! | `notebridge export` | Export notes updated since the last run |
//! | `notebridge split <paths>` | Chunk exported `.enex` files into JSONL |
//! | `notebridge parse` | Split an answer into text and decoded sources |
//! | `notebridge ask "<question>"` | Ask the Q&A service |
//!
//! ## Examples
//!
//! ```bash
//! # First export, everything since the configured start
//! notebridge export --config ./config/notebridge.toml
//!
//! # Re-export everything in the "Health" stack
//! notebridge export --full --stack Health
//!
//! # Decode an answer saved by another tool
//! notebridge parse --file answer.txt
//! ```

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notebridge::chat;
use notebridge::citation::Answer;
use notebridge::config::{self, Config};
use notebridge::export::{self, ExportArgs};
use notebridge::migrate;
use notebridge::progress::ProgressMode;
use notebridge::snapshot_source::SnapshotSource;
use notebridge::sources;
use notebridge::split;

/// notebridge: export notes for retrieval and decode the answers that cite them.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/notebridge.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "notebridge",
    about = "Incremental note export and citation decoding for retrieval-augmented chat",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/notebridge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the checkpoint database.
    ///
    /// Idempotent. `export` also creates the schema on first use.
    Init,

    /// List notebooks that an export would visit.
    Notebooks {
        /// Only notebooks in this stack. Defaults to `export.stack_filter`.
        #[arg(long)]
        stack: Option<String>,
    },

    /// Show the stored export window and the last few runs.
    Status {
        #[arg(long)]
        stack: Option<String>,
    },

    /// Export notes updated since the last successful run.
    Export {
        /// Ignore the stored window and start from `export.since`.
        #[arg(long)]
        full: bool,

        /// Start the window here instead (`YYYY-MM-DD HH:MM:SS`, UTC).
        #[arg(long)]
        since: Option<String>,

        /// Only notebooks in this stack.
        #[arg(long)]
        stack: Option<String>,

        /// Write files here instead of `export.output_dir`.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Progress output: `off`, `human` or `json`. Human when stderr is a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Chunk exported `.enex` files into JSON lines.
    Split {
        /// Files or directories to read.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output file. Defaults to stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Split an answer into its text and decoded sources.
    ///
    /// Reads the answer from the argument, from `--file`, or from stdin.
    Parse {
        text: Option<String>,

        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Ask the Q&A service a question.
    Ask {
        question: String,

        /// Session file carrying the conversation across calls.
        #[arg(long)]
        session: Option<PathBuf>,

        /// Start a fresh conversation even if the session file exists.
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Commands that don't require config
    if let Commands::Parse { text, file } = &cli.command {
        // Decoding works without a config file, but a broken one is an error
        let cfg = if cli.config.exists() {
            config::load_config(&cli.config)?
        } else {
            Config::minimal()
        };
        let raw = match (text, file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?,
            (None, None) => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf
            }
        };
        print_answer(&raw, &cfg)?;
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Notebooks { stack } => {
            let source = open_source(&cfg)?;
            let stack = stack.or_else(|| cfg.export.stack_filter.clone());
            sources::list_notebooks(&source, stack.as_deref()).await?;
        }
        Commands::Status { stack } => {
            let stack = stack.or_else(|| cfg.export.stack_filter.clone());
            sources::show_status(&cfg, stack.as_deref()).await?;
        }
        Commands::Export {
            full,
            since,
            stack,
            output,
            progress,
        } => {
            let mode = match progress {
                Some(p) => ProgressMode::parse(&p)
                    .with_context(|| format!("unknown progress mode '{}'", p))?,
                None => ProgressMode::default_for_tty(),
            };
            let reporter = mode.reporter();
            let source = open_source(&cfg)?;
            let args = ExportArgs {
                full,
                since,
                stack,
                output,
            };
            export::run_export(&cfg, &source, args, reporter.as_ref()).await?;
        }
        Commands::Split { paths, output } => {
            let codec = cfg.export.codec()?;
            split::run_split(&paths, output.as_deref(), &cfg.chunking, &codec)?;
        }
        Commands::Ask {
            question,
            session,
            reset,
        } => {
            let codec = cfg.export.codec()?;
            chat::run_ask(&cfg.chat, codec, &question, session.as_deref(), reset).await?;
        }
        Commands::Parse { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}

fn open_source(cfg: &Config) -> anyhow::Result<SnapshotSource> {
    let Some(path) = &cfg.source.snapshot else {
        bail!("source.snapshot is not configured");
    };
    SnapshotSource::load(path)
}

fn print_answer(raw: &str, cfg: &Config) -> anyhow::Result<()> {
    let codec = cfg.export.codec()?;
    let parsed = Answer::from_response(raw, &codec).into_parsed();
    println!("{}", parsed.answer_text.trim());
    if let Some(sources) = parsed.display_sources() {
        println!();
        println!("Sources: {}", sources);
    }
    Ok(())
}
