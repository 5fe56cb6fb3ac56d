use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use pingpace_core::config::ScheduleSettings;
use pingpace_core::history::logger::DEFAULT_MAX_SIZE_BYTES;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Keep-warm ping scheduler and usage velocity tracker")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Usage poll interval in seconds
    #[arg(short = 'i', long)]
    pub poll_interval: Option<u64>,

    /// Ping interval in minutes
    #[arg(long)]
    pub interval: Option<u32>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the scheduler in the foreground (default)
    Run,
    /// Print velocity metrics from the stored sample history
    Status {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print recent ping history
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run, defaulting to `run`
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// When and how often to ping
    #[serde(default)]
    pub schedule: ScheduleSettings,

    /// How a ping is executed
    #[serde(default)]
    pub ping: PingSettings,

    /// Where usage readings come from
    #[serde(default)]
    pub usage: UsageSettings,

    /// Ping history log
    #[serde(default)]
    pub history: HistorySettings,

    /// Sample persistence
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Ping command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingSettings {
    /// Executable to run (prompt and model are appended)
    #[serde(default = "default_ping_command")]
    pub command: String,

    /// Extra arguments placed before the prompt
    #[serde(default)]
    pub args: Vec<String>,

    /// Timeout for one attempt in seconds
    #[serde(default = "default_ping_timeout")]
    pub timeout_secs: u64,
}

fn default_ping_command() -> String {
    "claude".to_string()
}

fn default_ping_timeout() -> u64 {
    120
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            command: default_ping_command(),
            args: Vec::new(),
            timeout_secs: default_ping_timeout(),
        }
    }
}

/// Usage source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSettings {
    /// Shell command printing usage as JSON or `/usage` text.
    /// Without one, reset pings and velocity tracking are off.
    #[serde(default)]
    pub command: Option<String>,

    /// Poll interval in seconds
    #[serde(default = "default_usage_poll_interval")]
    pub poll_interval_secs: u64,

    /// Timeout for one usage command run in seconds
    #[serde(default = "default_usage_timeout")]
    pub timeout_secs: u64,
}

fn default_usage_poll_interval() -> u64 {
    60
}

fn default_usage_timeout() -> u64 {
    30
}

impl Default for UsageSettings {
    fn default() -> Self {
        Self {
            command: None,
            poll_interval_secs: default_usage_poll_interval(),
            timeout_secs: default_usage_timeout(),
        }
    }
}

/// Ping history settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySettings {
    /// Log file (defaults to the data directory)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Maximum log file size in bytes before rotation
    #[serde(default = "default_history_max_size")]
    pub max_size_bytes: u64,
}

fn default_history_max_size() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            path: None,
            max_size_bytes: default_history_max_size(),
        }
    }
}

/// Sample persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Sample file (defaults to the data directory)
    #[serde(default)]
    pub samples_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // Try custom path first
        if let Some(p) = path {
            if p.exists() {
                return Self::read(p);
            }
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("pingpace/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/pingpace/config.toml")),
            dirs::home_dir().map(|p| p.join(".pingpace.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::read(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(poll_interval) = cli.poll_interval {
            self.usage.poll_interval_secs = poll_interval;
        }
        if let Some(interval) = cli.interval {
            self.schedule.interval_minutes = interval;
        }
    }

    /// Validate and normalize settings values
    ///
    /// Clamps intervals and timeouts to sane minimums.
    pub fn validate(&mut self) {
        const MIN_USAGE_POLL_SECS: u64 = 5;

        if self.schedule.interval_minutes < 1 {
            self.schedule.interval_minutes = 1;
        }
        if self.usage.poll_interval_secs < MIN_USAGE_POLL_SECS {
            self.usage.poll_interval_secs = MIN_USAGE_POLL_SECS;
        }
        if self.usage.timeout_secs < 1 {
            self.usage.timeout_secs = 1;
        }
        if self.ping.timeout_secs < 1 {
            self.ping.timeout_secs = 1;
        }
    }

    /// Narrow snapshot handed to the scheduler
    pub fn schedule(&self) -> ScheduleSettings {
        self.schedule.clone()
    }

    /// Directory for history and samples
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("pingpace"))
            .unwrap_or_else(|| PathBuf::from(".pingpace"))
    }

    /// Resolved history log path
    pub fn history_path(&self) -> PathBuf {
        self.history
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("history.ndjson"))
    }

    /// Resolved sample file path
    pub fn samples_path(&self) -> PathBuf {
        self.storage
            .samples_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("samples.json"))
    }
}
