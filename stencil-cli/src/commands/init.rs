//! `stencil init <root>` — register a source tree with the synchronizer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_core::config;

/// Register a source tree for the scheduled synchronizer.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Absolute or relative path to the source tree root.
    pub root: PathBuf,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.root.display()))?;

        let mut cfg = config::load().context("failed to load configuration")?;
        let added = cfg.add_root(root.clone());
        config::save(&cfg).context("failed to save configuration")?;

        if added {
            println!("✓ Registered scan root '{}'", root.display());
            println!("  The scheduled job will synchronize it on its next firing.");
        } else {
            println!("'{}' is already registered", root.display());
        }
        Ok(())
    }
}
