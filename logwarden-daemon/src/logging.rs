//! Logging initialization for logwarden-daemon.
//!
//! Configures `tracing-subscriber` from the `[general]` section of
//! `LogwardenConfig`. `RUST_LOG`, when set, wins over `general.log_level`.

use std::str::FromStr;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use logwarden_core::config::GeneralConfig;

/// Output format of the daemon's own logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-parseable JSON lines (default for production).
    Json,
    /// Human-readable multi-line output (for development).
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{other}', expected 'json' or 'pretty'"
            )),
        }
    }
}

/// Build the level filter for the daemon.
pub fn env_filter(config: &GeneralConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
}

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let registry = tracing_subscriber::registry().with(env_filter(config));

    let result = match format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("failed to initialize {format:?} tracing subscriber: {e}"))
}
