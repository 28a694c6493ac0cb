use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "inksync")]
#[command(about = "Sync handwriting notes between a local cache and the note server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local cache database
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Note server URL (overrides config file and INKSYNC_SERVER_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub server_url: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show server reachability and the local cache
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List cached notes
    #[command(alias = "ls")]
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one cached note
    Show {
        /// Book key
        book: String,
        /// Record UUID
        record: String,
        /// Print the full note as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch a note from the server into the local cache
    Pull {
        /// Book key
        book: String,
        /// Record UUID
        record: String,
        /// Skip the cache TTL and always ask the server
        #[arg(long)]
        force: bool,
    },
    /// Push the cached note to the server, merging on version conflicts
    Push {
        /// Book key
        book: String,
        /// Record UUID
        record: String,
    },
    /// Load a note JSON file into the local cache
    Import {
        /// Note JSON file
        path: PathBuf,
        /// Store under this book key instead of the file's
        #[arg(long, value_name = "KEY")]
        book: Option<String>,
        /// Store under this record UUID instead of the file's
        #[arg(long, value_name = "UUID")]
        record: Option<String>,
    },
    /// Write a cached note as JSON
    Export {
        /// Book key
        book: String,
        /// Record UUID
        record: String,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Inspect or change the CLI config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the config file and its location
    Show,
    /// Print the config file path
    Path,
    /// Update config values; omitted flags keep their current value
    Set {
        /// Note server URL
        #[arg(long, value_name = "URL")]
        server_url: Option<String>,
        /// Merge-and-retry rounds after a conflicting save
        #[arg(long, value_name = "N")]
        conflict_retries: Option<u32>,
        /// Delay before re-syncing after reconnect
        #[arg(long, value_name = "MS")]
        reconnect_debounce_ms: Option<u64>,
        /// Serve cached notes younger than this without asking the server
        #[arg(long, value_name = "SECS")]
        cache_ttl_secs: Option<u64>,
        /// HTTP request timeout
        #[arg(long, value_name = "SECS")]
        request_timeout_secs: Option<u64>,
        /// Local cache database path
        #[arg(long, value_name = "PATH")]
        db_path: Option<PathBuf>,
    },
    /// Remove a value so the default applies again
    Unset {
        /// One of: server-url, cache-ttl-secs, db-path
        key: String,
    },
}
