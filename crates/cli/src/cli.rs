//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CARLA Recorder - record simulator sensor streams to disk
#[derive(Parser, Debug)]
#[command(
    name = "carla-recorder",
    author,
    version,
    about = "Record CARLA sensor streams to disk",
    long_about = "Connects to CARLA, spawns an ego vehicle with the configured sensors and \n\
                  records every sensor frame for a fixed duration.\n\n\
                  Output: <output>/<sensor_id>/frame_NNNNNN.bin, sensors.jsonl, manifest.json"
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CARLA_RECORDER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "CARLA_RECORDER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn metrics_port(&self) -> Option<u16> {
        match &self.command {
            Commands::Record(args) if args.metrics_port != 0 => Some(args.metrics_port),
            _ => None,
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session
    Record(RecordArgs),

    /// Validate configuration file without connecting
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `record` command
#[derive(Parser, Debug, Clone)]
pub struct RecordArgs {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long, env = "CARLA_RECORDER_CONFIG")]
    pub config: PathBuf,

    /// Output directory for the session
    #[arg(short, long, env = "CARLA_RECORDER_OUTPUT")]
    pub output: PathBuf,

    /// Recording duration in seconds
    #[arg(short, long, default_value = "30", env = "CARLA_RECORDER_DURATION")]
    pub duration: f64,

    /// Override CARLA server host from configuration
    #[arg(long, env = "CARLA_HOST")]
    pub host: Option<String>,

    /// Override CARLA server port from configuration
    #[arg(long, env = "CARLA_PORT")]
    pub port: Option<u16>,

    /// Override connection timeout in seconds
    #[arg(long)]
    pub timeout: Option<f64>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "CARLA_RECORDER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Do not fsync frame files and log lines
    #[arg(long)]
    pub no_sync: bool,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
