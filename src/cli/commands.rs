//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: long-running host driving the engine from a settings file
//! - reload: one-shot reload against the tab snapshot
//! - jobs: scheduled job management
//! - settings: read and write extension settings
//! - menu: print the context menu a rebuild would produce

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tabreload - browser tab reload orchestration
#[derive(Parser, Debug)]
#[command(name = "tabreload")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Which tabs a one-shot reload targets
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadMode {
    Window,
    AllWindows,
    Pinned,
    Unpinned,
    Left,
    Right,
    Matched,
    SkipMatched,
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the engine until interrupted (default)
    Run,

    /// Reload tabs once and print what was reloaded
    Reload {
        /// Reload mode; defaults to the configured button action
        #[arg(short, long, value_enum)]
        mode: Option<ReloadMode>,

        /// Window to reload; defaults to the current window
        #[arg(short, long)]
        window: Option<i64>,

        /// Reload one tab group of the window instead
        #[arg(short, long, conflicts_with = "mode")]
        group: Option<i64>,
    },

    /// Scheduled job management
    Jobs {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Read or write extension settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },

    /// Print the context menu tree
    Menu,
}

/// Scheduled job subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum JobCommands {
    /// List all jobs
    List,

    /// Add a job
    Add {
        /// Domain or URL pattern (`*` wildcards allowed)
        domain: String,

        /// Interval in minutes
        #[arg(short, long, default_value_t = 5.0)]
        interval: f64,

        /// Bypass the cache when reloading
        #[arg(long)]
        bypass_cache: bool,

        /// Skip the active tab
        #[arg(long)]
        exclude_active: bool,

        /// Skip tabs playing audio
        #[arg(long)]
        exclude_audio: bool,

        /// Minutes before the first run; defaults to the interval
        #[arg(long)]
        start_after: Option<f64>,

        /// Pause between tab reloads, in milliseconds
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Remove a job
    Remove {
        /// Job ID
        id: String,
    },

    /// Flip a job between active and paused
    Toggle {
        /// Job ID
        id: String,
    },

    /// Enable every job
    StartAll,

    /// Pause every job
    StopAll,
}

/// Settings subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommands {
    /// Show coerced values; all known settings when no key is given
    Get {
        keys: Vec<String>,
    },

    /// Store a raw JSON value
    Set {
        key: String,

        /// JSON value; bare words are stored as strings
        value: String,
    },
}
