//! feedrelay - RSS/Atom feed relay
//!
//! Main entry point for the feedrelay binary.

use anyhow::Result;

use feedrelay::cli::{Cli, Commands};
use feedrelay::commands;
use feedrelay::config::Config;
use feedrelay::logging::init_logging;
use feedrelay::observer::init_metrics_exporter;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/feedrelay.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    init_logging(&config.logging)?;

    // Execute command
    match cli.command {
        Commands::Run { once, .. } => {
            init_metrics_exporter();
            tracing::info!(once, "Starting feed relay");
            commands::run::run_relay(config, once).await?;
            Ok(())
        }
        Commands::Watermark { command } => {
            tracing::debug!("Starting watermark command");
            commands::watermark::handle_watermark(&config, command).await?;
            Ok(())
        }
    }
}
