use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Track income and expenses offline, sync when you can")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Treat the network as unavailable; every change is queued
    #[arg(long, global = true)]
    pub offline: bool,

    /// Directory holding the local ledger
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// User whose ledger to operate on
    #[arg(long, global = true, value_name = "ID")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a transaction
    #[command(alias = "new")]
    Add {
        /// Signed amount; negative for expenses
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Description
        #[arg(required = true)]
        description: Vec<String>,
        /// Booking date, defaults to today
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
        /// Category label
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List transactions, newest first
    #[command(alias = "ls")]
    List {
        /// Number of transactions to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing transaction
    Edit {
        /// Transaction ID or unique ID prefix
        id: String,
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        /// New category; an empty value removes it
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a transaction
    #[command(alias = "rm")]
    Delete {
        /// Transaction ID or unique ID prefix
        id: String,
    },
    /// Show changes waiting to be synced
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push queued changes to the server
    Sync {
        /// Keep running and sync on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Fetch server records and merge them into the local ledger
    Pull,
    /// Clear the local ledger and its queue for the current user
    Reset {
        /// Confirm discarding local data, including unsynced changes
        #[arg(long)]
        yes: bool,
    },
    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Create or update the config file
    Init {
        /// Default user id
        #[arg(long = "set-user", value_name = "ID")]
        user_id: Option<String>,
        /// Base URL of the records API
        #[arg(long, value_name = "URL")]
        api_url: Option<String>,
        /// Bearer token for the records API
        #[arg(long, value_name = "TOKEN")]
        api_token: Option<String>,
        /// Default data directory
        #[arg(long = "set-data-dir", value_name = "PATH")]
        data_dir: Option<PathBuf>,
    },
    /// Print the effective configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
