//! # Switchyard Bot
//!
//! Discord bot binary built on the Switchyard dispatch core.
//!
//! Loads configuration, wires storage, commands and the [`Dispatcher`](switchyard_commands::Dispatcher)
//! into an [`App`], reconciles the command registry and serves gateway
//! interactions through serenity.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod adapter;
pub mod app;
pub mod bot;
pub mod cli;
pub mod commands;
pub mod error;

pub use adapter::SerenityInteraction;
pub use app::App;
pub use cli::{Cli, CliCommand, ScopeArg, ScopeArgs, SyncArgs};
pub use error::{BotError, BotResult};

use std::sync::Arc;
use switchyard_common::SwitchyardError;
use tracing::{error, info};

/// Execute one parsed command line
pub async fn execute(app: Arc<App>, command: CliCommand) -> BotResult<()> {
    match command {
        CliCommand::Run => serve(app).await,
        CliCommand::Sync(args) => {
            let scope = app.scope(args.scope.scope)?;
            let report = app.sync(scope, args.force, args.clear_opposite).await?;
            println!("{}", serde_json::to_string_pretty(&report).map_err(SwitchyardError::from)?);
            Ok(())
        }
        CliCommand::Check(args) => {
            let scope = app.scope(args.scope)?;
            let diff = app.check(scope).await?;
            println!("{}", serde_json::to_string_pretty(&diff).map_err(SwitchyardError::from)?);
            Ok(())
        }
    }
}

async fn serve(app: Arc<App>) -> BotResult<()> {
    app.start_background_tasks();

    let config = app.config.get();
    if config.sync.on_startup && config.has_token() {
        let scope = app.default_scope();
        match app.sync(scope, false, false).await {
            Ok(report) => info!(
                "Startup sync of {}: {:?}, {} pushed, {} deleted",
                report.scope, report.action, report.pushed, report.deleted
            ),
            Err(e) => error!("Startup sync failed, serving the existing registry: {}", e),
        }
    }

    bot::start(app).await
}
