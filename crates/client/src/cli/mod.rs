//! CLI command definitions.

pub mod transactions;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::client::DEFAULT_BASE_URL;

/// CLI client for the expensync API.
#[derive(Debug, Parser)]
#[command(name = "expensync-client")]
#[command(about = "Track expenses against an expensync server", long_about = None)]
pub struct Cli {
    /// Server base URL.
    #[arg(long, env = "EXPENSYNC_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Output format.
    #[arg(long, default_value = "pretty")]
    pub format: OutputFormat,

    /// Suppress non-essential output.
    #[arg(long)]
    pub quiet: bool,

    /// Local cache file. Without it the cache only lives for this run.
    #[arg(long, env = "EXPENSYNC_CACHE_PATH")]
    pub cache_path: Option<String>,

    /// Seconds the local cache is served without asking the server.
    #[arg(long, env = "EXPENSYNC_CACHE_TTL_SECS", default_value_t = 1800)]
    pub cache_ttl_secs: u64,

    /// Transactions fetched per page.
    #[arg(long, env = "EXPENSYNC_PAGE_SIZE", default_value_t = 50)]
    pub page_size: usize,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Raw JSON output.
    Json,
    /// Human-readable output.
    #[default]
    Pretty,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List transactions, newest first.
    List {
        /// Fetch every page instead of the first one.
        #[arg(long)]
        all: bool,
    },
    /// Show one transaction.
    Get {
        id: String,
    },
    /// Record a new transaction.
    Add(transactions::AddArgs),
    /// Change fields of a transaction.
    Update {
        id: String,
        #[command(flatten)]
        fields: transactions::UpdateArgs,
    },
    /// Delete a transaction.
    Delete {
        id: String,
    },
    /// Totals, balance and expenses per category over all transactions.
    Summary {
        /// Only count expenses made at this location.
        #[arg(long)]
        location: Option<String>,
    },
    /// Drop the local cache and reload from the server.
    Refresh,
    /// Follow live changes until interrupted.
    Watch {
        /// Print raw change events instead of the running summary.
        #[arg(long)]
        raw: bool,
        /// Resume raw events after this sequence number.
        #[arg(long, requires = "raw")]
        last_event_id: Option<u64>,
    },
    /// Normalize a legacy JSON export and upload it.
    Import {
        /// JSON file holding an array of records.
        file: PathBuf,
        /// Only print the normalization report.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the server's change feed position.
    Health,
}
