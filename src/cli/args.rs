//! CLI argument definitions using Clap

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Default time `send` waits for replies, in seconds
pub const DEFAULT_WAIT_SECS: u64 = 3;

/// fieldlink - relay photos, voice clips and questions to a remote assistant
#[derive(Parser, Debug)]
#[command(name = "fieldlink")]
#[command(version)]
#[command(about = "Relay geotagged photos, voice clips and text to a remote assistant")]
#[command(long_about = None)]
pub struct Cli {
    /// Relay endpoint (ws:// or wss:// URL)
    #[arg(short = 'e', long, value_name = "URL", global = true)]
    pub endpoint: Option<String>,

    /// Read photos from this image file instead of running the camera command
    #[arg(long, value_name = "PATH")]
    pub photo_source: Option<PathBuf>,

    /// Log diagnostics to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send one text message and print the replies
    Send {
        /// Message text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,

        /// Seconds to wait for replies after sending
        #[arg(short = 'w', long, value_name = "SECS", default_value_t = DEFAULT_WAIT_SECS)]
        wait: u64,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
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
pub use crate::domain::config::CONFIG_KEYS as VALID_CONFIG_KEYS;

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}
