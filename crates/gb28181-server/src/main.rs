//! GB28181 SIP signaling server entry point.

mod context;

use anyhow::{Context as _, Result};
use clap::Parser;

use gb28181_infra_common::logging::parse_log_level;
use gb28181_infra_common::{setup_logging, Config, LoggingConfig};

use context::Server;

#[derive(Parser, Debug)]
#[command(name = "gb28181-server", about = "GB28181 SIP signaling server")]
struct Args {
    /// Path (without extension) to the config file, e.g. `config` for `config.yml`.
    #[arg(long, default_value = "")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config).context("loading configuration")?;

    // The config's log level is one of DEBUG/INFO/WARNING/ERROR; `tracing::Level`
    // spells the third one WARN.
    let level_token = if config.logger.eq_ignore_ascii_case("WARNING") { "WARN" } else { &config.logger };
    let logging = LoggingConfig {
        level: parse_log_level(level_token).unwrap_or(tracing::Level::INFO),
        app_name: "gb28181-server".to_string(),
        ..LoggingConfig::default()
    };
    setup_logging(logging).context("initializing logging")?;

    let server = Server::bind(config).await.context("binding server")?;
    server.run().await
}
