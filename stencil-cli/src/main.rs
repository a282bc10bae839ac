//! Stencil — incremental artifact synchronizer CLI.
//!
//! # Usage
//!
//! ```text
//! stencil init <root>
//! stencil sync [root] [--dry-run]
//! stencil cleanup <prefix>
//! stencil status [--json]
//! stencil daemon start|stop|status|install|uninstall|logs
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    cleanup::CleanupArgs, daemon::DaemonCommand, init::InitArgs, status::StatusArgs,
    sync::SyncArgs,
};

#[derive(Parser, Debug)]
#[command(
    name = "stencil",
    version,
    about = "Keep generated artifacts in sync with their sources",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register a source tree for the scheduled synchronizer.
    Init(InitArgs),

    /// Force one synchronization pass, optionally scoped to a single root.
    Sync(SyncArgs),

    /// Delete tracked state and generated output under a location prefix.
    Cleanup(CleanupArgs),

    /// Show tracked artifacts and daemon runtime state.
    Status(StatusArgs),

    /// Manage the Stencil background daemon and launchd integration.
    Daemon {
        #[command(subcommand)]
        command: DaemonCommand,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init(args) => args.run(),
        Commands::Sync(args) => args.run(),
        Commands::Cleanup(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Daemon { command } => commands::daemon::run(command),
    }
}
