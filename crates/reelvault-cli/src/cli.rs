use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "reelvault")]
#[command(version, about = "ReelVault - series catalog and file distribution bot")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to ~/.config/reelvault/config.toml)
    #[arg(long, global = true, env = "REELVAULT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database path (overrides storage.db_path)
    #[arg(long, global = true, env = "REELVAULT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Log directory (defaults to ~/.local/share/reelvault/logs)
    #[arg(long, global = true, env = "REELVAULT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Bot API token
    #[arg(long, global = true, env = "REELVAULT_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Canonical storage channel id
    #[arg(long, global = true, env = "REELVAULT_CANONICAL_CHANNEL", allow_negative_numbers = true)]
    pub canonical_channel: Option<i64>,

    /// Announcement channel id
    #[arg(long, global = true, env = "REELVAULT_ANNOUNCE_CHANNEL", allow_negative_numbers = true)]
    pub announce_channel: Option<i64>,

    /// Also log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot until interrupted
    Run,

    /// Encode or decode range links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },

    /// Resolve a search query against the published catalog
    Search {
        /// Query as a user would type it
        query: String,

        /// Apply the group-chat threshold
        #[arg(long)]
        group: bool,
    },

    /// Inspect the catalog
    Series {
        #[command(subcommand)]
        command: SeriesCommands,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum LinkCommands {
    /// Build the deep link for a message range
    Encode {
        #[arg(allow_negative_numbers = true)]
        channel_id: i64,
        first_id: i64,
        last_id: i64,
    },
    /// Decode a token or deep link into its range
    Decode { link: String },
}

#[derive(Subcommand)]
pub enum SeriesCommands {
    /// List all series
    List {
        /// Only published series
        #[arg(long)]
        published: bool,
    },
    /// Show a series' catalog tree
    Show { id: String },
    /// Print the content digest and whether an announcement is due
    Digest { id: String },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration (token redacted)
    Show,
    /// Print the config file path
    Path,
}
