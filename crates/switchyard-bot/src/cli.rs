//! Command line interface.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Discord bot built on the Switchyard dispatch core.
#[derive(Debug, Parser)]
#[command(name = "switchyard", version, about)]
pub struct Cli {
    /// Configuration file, overrides `SWITCHYARD_CONFIG_PATH`.
    #[arg(short, long, global = true, env = "SWITCHYARD_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

/// What to do.
#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Connect to the gateway and serve interactions (default).
    Run,
    /// Reconcile the remote command registry once and exit.
    Sync(SyncArgs),
    /// Print the difference between the manifest and the last pushed snapshot.
    Check(ScopeArgs),
}

/// Scope selection shared by `sync` and `check`.
#[derive(Debug, Clone, clap::Args)]
pub struct ScopeArgs {
    /// Catalog to reconcile.
    #[arg(long, value_enum, default_value_t = ScopeArg::Global)]
    pub scope: ScopeArg,
}

/// Arguments of `sync`.
#[derive(Debug, Clone, clap::Args)]
pub struct SyncArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Push the whole manifest regardless of the diff.
    #[arg(long)]
    pub force: bool,

    /// Empty the opposite catalog afterwards.
    #[arg(long)]
    pub clear_opposite: bool,
}

/// Catalog names accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    Global,
    Development,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::parse_from(["switchyard", "sync", "--scope", "development", "--force"]);
        let Some(CliCommand::Sync(args)) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.scope.scope, ScopeArg::Development);
        assert!(args.force);
        assert!(!args.clear_opposite);
    }

    #[test]
    fn test_run_is_the_default() {
        let cli = Cli::parse_from(["switchyard"]);
        assert!(cli.command.is_none());
    }
}
