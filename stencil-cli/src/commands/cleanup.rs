//! `stencil cleanup <prefix>` — prune state and output under a prefix.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_core::state::SqliteStateStore;
use stencil_daemon::{request_cleanup, DaemonError};
use stencil_sync::cleanup_prefix;

/// Arguments for `stencil cleanup`.
#[derive(Args, Debug)]
pub struct CleanupArgs {
    /// Location prefix to delete, e.g. the path of a removed folder.
    pub prefix: String,
}

impl CleanupArgs {
    pub fn run(self) -> Result<()> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;

        let removed = match request_cleanup(&home, self.prefix.clone()) {
            Ok(summary) => summary
                .get("removed")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            Err(DaemonError::DaemonNotRunning { .. }) => {
                let store = SqliteStateStore::open_at(&home)
                    .context("failed to open the state database")?;
                cleanup_prefix(&store, &self.prefix)
                    .with_context(|| format!("cleanup failed for prefix '{}'", self.prefix))?
            }
            Err(err) => return Err(err).context("daemon cleanup failed"),
        };

        if removed == 0 {
            println!("✓ nothing tracked under '{}'", self.prefix);
        } else {
            println!("✓ removed {} record(s) under '{}'", removed, self.prefix);
        }
        Ok(())
    }
}
