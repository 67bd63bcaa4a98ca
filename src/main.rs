//! # lachaise-sync CLI (`lsync`)
//!
//! ## Usage
//!
//! ```bash
//! lsync --config ./config/lsync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lsync init` | Create the SQLite database and run schema migrations |
//! | `lsync osm import <file>` | Load OpenStreetMap elements from a JSON export |
//! | `lsync sync <kind>` | Run one synchronization, or `all` in dependency order |
//! | `lsync status` | Show table sizes and the last outcome of each sync |
//! | `lsync export` | Dump every table as JSON |
//! | `lsync serve` | Start the read-only HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use lachaise_sync::progress::ProgressMode;
use lachaise_sync::{config, export, migrate, server, stats, sync};

/// Mirror the Wikidata, Commons and Wikipedia records of the Père Lachaise
/// graves into SQLite.
#[derive(Parser)]
#[command(name = "lsync", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/lsync.toml")]
    config: PathBuf,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it again keeps existing data.
    Init,

    /// Manage OpenStreetMap elements.
    Osm {
        #[command(subcommand)]
        action: OsmAction,
    },

    /// Run a synchronization.
    ///
    /// Kinds: `wikidata`, `wikimedia_commons_categories`,
    /// `wikimedia_commons_files`, `wikipedia`, `wikidata_occupations`,
    /// or `all`.
    Sync {
        kind: String,

        /// `|`-separated identifiers to refresh instead of the derived
        /// working set. Nothing is deleted in that mode.
        #[arg(long)]
        only: Option<String>,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Show row counts and the synchronizations table.
    Status,

    /// Export every table as one JSON document.
    Export {
        /// Output file path. Writes to stdout if not specified.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Start the read-only HTTP API on `[server].bind`.
    Serve,
}

#[derive(Subcommand)]
enum OsmAction {
    /// Import elements from a JSON array.
    Import {
        file: PathBuf,

        /// Keep stored elements missing from the file.
        #[arg(long)]
        partial: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Osm { action } => match action {
            OsmAction::Import { file, partial } => {
                sync::osm::run_import(&cfg, &file, partial).await?;
            }
        },
        Commands::Sync {
            kind,
            only,
            progress,
        } => {
            let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
            sync::run_command(&cfg, &kind, only.as_deref(), reporter.as_ref()).await?;
        }
        Commands::Status => {
            stats::run_status(&cfg).await?;
        }
        Commands::Export { output } => {
            export::run_export(&cfg, output.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
