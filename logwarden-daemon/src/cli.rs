//! CLI argument definitions for logwarden-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Logwarden log monitoring daemon.
///
/// Tails the configured log files, classifies every new line with the
/// threat rules and the anomaly model, and raises an alert whenever the
/// accumulated suspicious activity reaches the configured threshold.
#[derive(Parser, Debug)]
#[command(name = "logwarden-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to logwarden.toml configuration file.
    #[arg(short, long, default_value = "/etc/logwarden/logwarden.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,

    /// Run a single poll cycle over every watched file, print the summary, and exit.
    #[arg(long, conflicts_with_all = ["train", "validate"])]
    pub once: bool,

    /// Train the anomaly model from an existing log file, save it to
    /// `monitor.model_path`, and exit.
    #[arg(long, value_name = "FILE", conflicts_with = "validate")]
    pub train: Option<PathBuf>,
}
