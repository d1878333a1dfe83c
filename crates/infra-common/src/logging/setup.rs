use crate::errors::{Error, Result};
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};
use std::str::FromStr;

/// Configuration for the logging system: level plus the process name
/// included in its startup log line.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: Level,
    /// Application name to include in logs
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            app_name: "gb28181-server".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
        }
    }
}

/// Set up the logging system with the provided configuration
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive(config.level.into());

    fmt::Subscriber::builder().with_env_filter(filter).init();

    tracing::info!(app = %config.app_name, "logging initialized");
    Ok(())
}

/// Parse a log level from a string
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level)
        .map_err(|_| Error::Config(format!("Invalid log level: {}", level)))
} 