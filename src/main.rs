//! # docqa CLI
//!
//! The `docqa` binary uploads documents, runs retrieval and question
//! answering over them, and starts the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and schema |
//! | `docqa upload <path>... --user U` | Upload and chunk files or directories |
//! | `docqa list --user U` | List a user's documents |
//! | `docqa get <id> --user U` | Show a document and its chunks |
//! | `docqa delete <id> --user U` | Delete a document |
//! | `docqa process <id> --user U` | Re-chunk a document |
//! | `docqa sources "<query>" --user U` | Show ranked sources without answering |
//! | `docqa ask "<query>" --user U` | Answer a question and record it |
//! | `docqa history --user U` | Show recent questions |
//! | `docqa serve` | Start the HTTP API |
//!
//! Log verbosity is controlled with `RUST_LOG` (default `docqa=info`);
//! logs go to stderr.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docqa::{config, documents, ingest, migrate, qa, server};

/// docqa: ask questions about your documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docqa.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Document question answering with lexical chunk retrieval",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Upload files and chunk them.
    ///
    /// Directories are walked recursively for `.txt`, `.md`, `.html`,
    /// and `.pdf` files.
    Upload {
        /// Files or directories to upload.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Owner of the uploaded documents.
        #[arg(long)]
        user: String,

        /// Document title (single file only). Defaults to the file stem.
        #[arg(long)]
        title: Option<String>,

        /// Declared file type (`text`, `markdown`, `html`, `pdf`, or a MIME
        /// type). Defaults to the file extension.
        #[arg(long = "type")]
        file_type: Option<String>,
    },

    /// List a user's documents.
    List {
        #[arg(long)]
        user: String,
    },

    /// Show a document with its chunks.
    Get {
        id: String,
        #[arg(long)]
        user: String,
    },

    /// Delete a document and its chunks.
    Delete {
        id: String,
        #[arg(long)]
        user: String,
    },

    /// Re-chunk a document, replacing its existing chunks.
    Process {
        id: String,
        #[arg(long)]
        user: String,
    },

    /// Rank sources for a query without generating an answer.
    Sources {
        query: String,
        #[arg(long)]
        user: String,
    },

    /// Answer a question from the user's documents.
    Ask {
        query: String,
        #[arg(long)]
        user: String,
    },

    /// Show the user's most recent questions.
    History {
        #[arg(long)]
        user: String,

        /// Maximum number of records, capped at `[history] limit`.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Start the HTTP API server.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload {
            paths,
            user,
            title,
            file_type,
        } => {
            ingest::run_upload(&cfg, &user, &paths, title, file_type).await?;
        }
        Commands::List { user } => {
            documents::run_list(&cfg, &user).await?;
        }
        Commands::Get { id, user } => {
            documents::run_get(&cfg, &user, &id).await?;
        }
        Commands::Delete { id, user } => {
            documents::run_delete(&cfg, &user, &id).await?;
        }
        Commands::Process { id, user } => {
            ingest::run_process(&cfg, &user, &id).await?;
        }
        Commands::Sources { query, user } => {
            qa::run_sources(&cfg, &user, &query).await?;
        }
        Commands::Ask { query, user } => {
            qa::run_ask(&cfg, &user, &query).await?;
        }
        Commands::History { user, limit } => {
            qa::run_history(&cfg, &user, limit).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
