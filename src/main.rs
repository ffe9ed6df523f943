//! # CAS Gateway CLI (`casg`)
//!
//! ## Usage
//!
//! ```bash
//! casg --config ./config/casg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `casg init` | Create the SQLite database, run migrations, create the default index |
//! | `casg indexes` | List indexes with object counts |
//! | `casg create-index <name>` | Create a named index |
//! | `casg put <path>` | Store a file or directory tree under content hashes |
//! | `casg get <hash>` | Retrieve a payload (or its metadata) by hash |
//! | `casg search` | Structured metadata search with paging and sorting |
//! | `casg serve` | Start the HTTP gateway |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cas_gateway::gateway::SearchParams;
use cas_gateway::{config, fetch, indexes, migrate, put, search, server};
use cas_gateway_core::pagination::{SortDirection, DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE};

/// CAS Gateway CLI: content-addressed storage with structured metadata search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/casg.example.toml`.
#[derive(Parser)]
#[command(
    name = "casg",
    about = "CAS Gateway: content-addressed storage with structured metadata search",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/casg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and the default index.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// List indexes and their object counts.
    Indexes,

    /// Create a named index.
    CreateIndex {
        /// Index name.
        name: String,
    },

    /// Store a file, or every file below a directory.
    Put {
        /// File or directory to store.
        path: PathBuf,

        /// Target index (defaults to `storage.default_index`).
        #[arg(long)]
        index: Option<String>,

        /// Content type to record. Guessed from the extension when omitted.
        #[arg(long)]
        content_type: Option<String>,

        /// Metadata attribute as `key=value`. Repeatable. JSON values keep
        /// their type (`year=2001` is a number).
        #[arg(long = "meta")]
        meta: Vec<String>,
    },

    /// Retrieve an object by content hash.
    ///
    /// Writes the payload to stdout, or to `--output`.
    Get {
        /// Content hash.
        hash: String,

        /// Only look in this index.
        #[arg(long)]
        index: Option<String>,

        /// Print metadata without loading the payload.
        #[arg(long)]
        metadata_only: bool,

        /// Write the payload to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Search object metadata.
    Search {
        /// Index to search (defaults to `storage.default_index`).
        #[arg(long)]
        index: Option<String>,

        /// Zero-based page number.
        #[arg(long, default_value_t = DEFAULT_PAGE_NUMBER)]
        page: i64,

        /// Page size.
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        size: i64,

        /// Attribute to sort by.
        #[arg(long)]
        sort: Option<String>,

        /// Sort direction: `ASC` or `DESC`. Ignored without `--sort`.
        #[arg(long, default_value = "ASC")]
        dir: SortDirection,

        /// Query as JSON, e.g. `{"eq":{"type":"doc"}}`. Omit to match everything.
        #[arg(long)]
        query: Option<String>,

        /// Print the result page as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Start the HTTP gateway.
    Serve,
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
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Indexes => {
            indexes::list_indexes(&cfg).await?;
        }
        Commands::CreateIndex { name } => {
            indexes::create_index(&cfg, &name).await?;
        }
        Commands::Put {
            path,
            index,
            content_type,
            meta,
        } => {
            put::run_put(
                &cfg,
                &path,
                index.as_deref(),
                content_type.as_deref(),
                &meta,
            )
            .await?;
        }
        Commands::Get {
            hash,
            index,
            metadata_only,
            output,
        } => {
            fetch::run_get(
                &cfg,
                &hash,
                index.as_deref(),
                metadata_only,
                output.as_deref(),
            )
            .await?;
        }
        Commands::Search {
            index,
            page,
            size,
            sort,
            dir,
            query,
            json,
        } => {
            let params = SearchParams {
                index,
                page,
                size,
                sort,
                dir,
            };
            search::run_search(&cfg, params, query, json).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
