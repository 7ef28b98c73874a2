//! # specdex CLI
//!
//! The `specdex` binary keeps a vector store in sync with a project's
//! specification documents.
//!
//! ## Usage
//!
//! ```bash
//! specdex --root ./my-project --config ./specdex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `specdex init` | Create the local databases and register collections |
//! | `specdex reindex [paths..]` | Sync the vector store with the document tree |
//! | `specdex collections` | Print the collection route table |
//! | `specdex status` | Per-collection document and chunk counts |
//!
//! ## Examples
//!
//! ```bash
//! # Index everything under the current directory
//! specdex reindex
//!
//! # Preview without touching anything
//! specdex reindex --dry-run
//!
//! # Reindex only the feature files, confirming first
//! specdex reindex --type feature --interactive
//!
//! # Reindex one directory, ignoring stored fingerprints
//! specdex reindex --directory docs/adrs --full
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use specdex::config::{load_config, Config};
use specdex::executor::{ApplyMode, StdinPrompt};
use specdex::fingerprint::FingerprintStore;
use specdex::models::DocType;
use specdex::pipeline::{run_reindex, ReindexRequest};
use specdex::progress::ProgressMode;
use specdex::resolver::CollectionResolver;
use specdex::scanner::ScanFilter;
use specdex::store::sqlite::SqliteVectorStore;

/// Incremental context indexer for specification documents.
#[derive(Parser)]
#[command(
    name = "specdex",
    about = "Keep a vector store in sync with a project's specification documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "./specdex.toml")]
    config: PathBuf,

    /// Document root to scan.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Progress output: off, human, or json. Defaults to human on a TTY.
    #[arg(long, global = true)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the local databases and register the configured collections.
    ///
    /// Idempotent. Running it against an existing state directory is safe.
    Init,

    /// Sync the vector store with the document tree.
    ///
    /// Scans, diffs content fingerprints against the last indexed state, and
    /// applies the minimal insert/update/delete plan. With path arguments the
    /// sync is restricted to those files (deletes included, scoped likewise).
    Reindex {
        /// Specific files to reindex, relative to the root.
        paths: Vec<String>,

        /// Restrict to one document type (feature, ts4, ui-intent, adr, business).
        #[arg(long = "type", value_name = "TYPE")]
        doc_type: Option<DocType>,

        /// Restrict to one directory, relative to the root.
        #[arg(long)]
        directory: Option<String>,

        /// Show the plan without applying it.
        #[arg(long)]
        dry_run: bool,

        /// Show the plan and ask for confirmation before applying.
        #[arg(long, conflicts_with = "dry_run")]
        interactive: bool,

        /// Reindex documents even when their fingerprints are unchanged.
        #[arg(long)]
        full: bool,

        /// Itemize every outcome in the report.
        #[arg(long)]
        verbose: bool,
    },

    /// Print the collection route table.
    Collections,

    /// Per-collection document and chunk counts from the fingerprint store.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&cli.root, &config).await?,
        Commands::Collections => run_collections(&config)?,
        Commands::Status => run_status(&cli.root, &config).await?,
        Commands::Reindex {
            paths,
            doc_type,
            directory,
            dry_run,
            interactive,
            full,
            verbose,
        } => {
            let filter = ScanFilter::from_args(&cli.root, &paths, doc_type, directory.as_deref())?;
            let mode = if dry_run {
                ApplyMode::DryRun
            } else if interactive {
                ApplyMode::Interactive
            } else {
                ApplyMode::Normal
            };
            let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

            let fingerprints = Arc::new(
                FingerprintStore::open(&config.store.fingerprint_db_under(&cli.root)).await?,
            );
            let store =
                Arc::new(SqliteVectorStore::open(&config.store.vector_db_under(&cli.root)).await?);

            let report = run_reindex(
                &cli.root,
                &config,
                store.clone(),
                fingerprints.clone(),
                progress.reporter(),
                &StdinPrompt,
                ReindexRequest { filter, mode, full },
            )
            .await?;

            store.close().await;
            fingerprints.close().await;

            print!("{}", report.render(verbose));
            if !report.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn run_init(root: &Path, config: &Config) -> anyhow::Result<()> {
    let resolver = CollectionResolver::new(&config.collections)?;

    let fingerprints =
        FingerprintStore::open(&config.store.fingerprint_db_under(root)).await?;
    fingerprints.close().await;

    let store = SqliteVectorStore::open(&config.store.vector_db_under(root)).await?;
    store.ensure_collections(&resolver.collections()).await?;
    store.close().await;

    println!("Initialized specdex state under {}", root.display());
    for name in resolver.collections() {
        println!("  collection: {}", name);
    }
    Ok(())
}

fn run_collections(config: &Config) -> anyhow::Result<()> {
    let resolver = CollectionResolver::new(&config.collections)?;
    println!(
        "{:<28} {:<10} {:<24} {}",
        "COLLECTION", "TYPE", "DIRECTORY", "PATTERN"
    );
    for (collection, doc_type, directory, pattern) in resolver.describe() {
        println!(
            "{:<28} {:<10} {:<24} {}",
            collection, doc_type, directory, pattern
        );
    }
    Ok(())
}

async fn run_status(root: &Path, config: &Config) -> anyhow::Result<()> {
    let fingerprints =
        FingerprintStore::open(&config.store.fingerprint_db_under(root)).await?;
    let stats = fingerprints.stats().await?;
    fingerprints.close().await;

    if stats.is_empty() {
        println!("Nothing indexed yet. Run `specdex reindex`.");
        return Ok(());
    }

    println!(
        "{:<28} {:>10} {:>10}  {}",
        "COLLECTION", "DOCUMENTS", "CHUNKS", "LAST INDEXED"
    );
    for entry in stats {
        let last = entry
            .last_indexed
            .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{:<28} {:>10} {:>10}  {}",
            entry.collection, entry.doc_count, entry.chunk_count, last
        );
    }
    Ok(())
}
