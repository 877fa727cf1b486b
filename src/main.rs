//! # docchat CLI
//!
//! Ask questions about a document and get answers that cite its pages and
//! headings.
//!
//! ## Usage
//!
//! ```bash
//! docchat [--config ./docchat.toml] [--verbose] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docchat chunks <doc>` | Show how a document is chunked (offline) |
//! | `docchat retrieve <doc> <query>` | Print the excerpts most relevant to a query |
//! | `docchat ask <doc> <question>` | Answer a question grounded in the document |
//! | `docchat rewrite <text> --meta <json>` | Rewrite `[CHUNK n]` markers (offline) |
//!
//! `<doc>` is a path relative to `[source].root`, or a link carrying the id
//! as a `/file/d/<id>` segment or an `id` query parameter.

use anyhow::Result;
use clap::{Parser, Subcommand};
use docchat::config;
use docchat::docref::DocumentRef;
use docchat::{ask, chunks_cmd, retrieve_cmd, rewrite_cmd};
use docchat_core::citation::CitationMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docchat: document-grounded chat with page and heading citations.
#[derive(Parser)]
#[command(
    name = "docchat",
    about = "Chat with a document: retrieval over its freshest text, answers with citations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document and print each chunk's offsets, page and heading.
    ///
    /// Does not call the embedding provider.
    Chunks {
        /// Document id (path under `[source].root`) or link.
        doc: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Build or load the document's index and print the top excerpts.
    Retrieve {
        /// Document id (path under `[source].root`) or link.
        doc: String,

        /// The query to rank excerpts against.
        query: String,

        /// Number of excerpts; defaults to `[retrieval].top_k`.
        #[arg(long)]
        k: Option<usize>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Answer a question about a document.
    Ask {
        /// Document id (path under `[source].root`) or link.
        doc: String,

        /// The question.
        question: String,

        /// Citation style: `none`, `page`, `title`, or `page-or-title`.
        /// Defaults to `[citations].mode`.
        #[arg(long)]
        mode: Option<CitationMode>,

        /// Print the answer and its excerpts as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rewrite `[CHUNK n]` markers in text using a JSON citation map.
    Rewrite {
        /// Text containing citation markers.
        text: String,

        /// Citation map, e.g. `{"1": {"page": 3}, "2": {"title": "Intro"}}`.
        #[arg(long)]
        meta: String,

        /// Citation style: `none`, `page`, `title`, or `page-or-title`.
        #[arg(long, default_value = "page-or-title")]
        mode: CitationMode,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let load_config = || config::load_or_default(cli.config.as_deref());

    match &cli.command {
        Commands::Chunks { doc, json } => {
            let cfg = load_config()?;
            chunks_cmd::run_chunks(&cfg, &DocumentRef::from_arg(doc), *json).await?;
        }
        Commands::Retrieve {
            doc,
            query,
            k,
            json,
        } => {
            let cfg = load_config()?;
            retrieve_cmd::run_retrieve(&cfg, &DocumentRef::from_arg(doc), query, *k, *json)
                .await?;
        }
        Commands::Ask {
            doc,
            question,
            mode,
            json,
        } => {
            let cfg = load_config()?;
            ask::run_ask(&cfg, &DocumentRef::from_arg(doc), question, *mode, *json).await?;
        }
        // Offline; never reads the config file.
        Commands::Rewrite { text, meta, mode } => {
            rewrite_cmd::run_rewrite(text, meta, *mode)?;
        }
    }

    Ok(())
}
