//! Main entry point for Switchyard.

use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use switchyard_bot::{execute, App, BotResult, Cli, CliCommand};
use switchyard_common::init_logging;
use switchyard_config::ConfigLoader;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> BotResult<()> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };

    // Held until exit so buffered file output is flushed
    let _guard = init_logging(&config.logging)?;
    info!("Starting Switchyard v{}", env!("CARGO_PKG_VERSION"));

    let app = Arc::new(App::build(config)?);
    execute(app, cli.command.unwrap_or(CliCommand::Run)).await
}
