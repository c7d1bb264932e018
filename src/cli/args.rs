//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// TBM Recorder - voice recordings for Tool-Box-Meeting reports
#[derive(Parser, Debug)]
#[command(name = "tbm-recorder")]
#[command(version)]
#[command(about = "Record, save and attach TBM safety briefing audio")]
#[command(long_about = None)]
pub struct Cli {
    /// Show debug logs (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a briefing for one team and date (interactive)
    Record(RecordOptions),
    /// Download a saved recording
    Download {
        /// URL of the stored recording
        url: String,
        /// Where to write the file
        output: PathBuf,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options for the record command
#[derive(clap::Args, Debug, Clone)]
pub struct RecordOptions {
    /// Team id of the TBM report
    #[arg(long, value_name = "ID")]
    pub team_id: u64,

    /// Team name, used in the file name
    #[arg(long, value_name = "NAME")]
    pub team_name: String,

    /// Report date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub date: String,

    /// Upload endpoint for this run
    #[arg(long, value_name = "URL", env = "TBM_UPLOAD_URL")]
    pub upload_url: Option<String>,

    /// Max recording length (e.g., 30m, 10m30s)
    #[arg(long, value_name = "TIME")]
    pub max_duration: Option<String>,
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "upload_url",
    "api_token",
    "max_duration",
    "max_upload_mb",
    "success_display",
    "formats",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
