//! `stencil sync [root]` — force one synchronization pass.
//!
//! Prefers the running daemon (so the pass obeys the singleton queue) and
//! falls back to an in-process pass when no daemon is listening. `--dry-run`
//! always runs in-process, since it must not mutate shared state anyway.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_core::report::PassReport;
use stencil_daemon::{request_sync, DaemonError};
use stencil_sync::pipeline::{self, SyncScope};

/// Arguments for `stencil sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source tree to synchronize (omit to sync every registered root).
    pub root: Option<PathBuf>,

    /// Report what would change without writing any output or state.
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        // Resolve the root up front: the daemon resolves paths against its
        // own working directory, so only absolute paths may cross the socket.
        let root = match self.root {
            Some(root) => Some(
                root.canonicalize()
                    .with_context(|| format!("cannot resolve path '{}'", root.display()))?,
            ),
            None => None,
        };

        if !self.dry_run {
            let root_arg = root.as_ref().map(|r| r.display().to_string());
            match request_sync(&home, root_arg) {
                Ok(summary) => {
                    print_daemon_summary(&summary);
                    return Ok(());
                }
                Err(DaemonError::DaemonNotRunning { .. }) => {}
                Err(err) => return Err(err).context("daemon sync failed"),
            }
        }

        let scope = match root {
            Some(root) => SyncScope::Root(root),
            None => SyncScope::All,
        };

        let report = pipeline::run(&home, scope, self.dry_run).context("sync failed")?;
        print_report(&report, self.dry_run);
        Ok(())
    }
}

fn print_report(report: &PassReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };

    if report.scanned == 0 && report.removed == 0 {
        println!("{prefix}✓ nothing to do — no artifacts found");
    } else {
        println!(
            "{prefix}✓ pass complete ({} generated, {} unchanged, {} removed)",
            report.generated, report.unchanged, report.removed
        );
    }

    for failure in &report.failures {
        println!("  ✗ {} [{}]: {}", failure.location, failure.stage, failure.message);
    }
}

fn print_daemon_summary(summary: &serde_json::Value) {
    let count = |key: &str| summary.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
    println!(
        "✓ pass complete via daemon ({} generated, {} unchanged, {} removed)",
        count("generated"),
        count("unchanged"),
        count("removed")
    );
    let failed = count("failed");
    if failed > 0 {
        println!("  {failed} artifact(s) failed; see daemon logs");
    }
}
