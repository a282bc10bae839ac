//! Atomic output writer.
//!
//! ## Write protocol per pending artifact
//!
//! 1. Render the output (pure, stencil-gen).
//! 2. Write to `<path>.stencil.tmp`.
//! 3. Rename to the final path (atomic on POSIX).
//! 4. Commit the new fingerprint to the state table.
//!
//! Output-then-state ordering: a crash between steps 3 and 4 leaves the
//! output ahead of the state table, and the next pass regenerates it
//! harmlessly because generation is idempotent.

use std::path::{Path, PathBuf};

use stencil_core::state::StateStore;
use stencil_gen::Generator;

use crate::classifier::PendingArtifact;
use crate::error::{io_err, SyncError};

/// Outcome of processing one pending artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// Output was written and the fingerprint committed.
    Written { path: PathBuf },
    /// `--dry-run` mode: the output *would* have been written.
    WouldWrite { path: PathBuf },
}

/// Generate one pending artifact's output, write it, commit its fingerprint.
///
/// On any failure before the state commit the table is left untouched, so
/// the next pass classifies the artifact as New/Modified again and retries.
pub fn generate_pending(
    store: &dyn StateStore,
    generator: &Generator,
    pending: &PendingArtifact,
    dry_run: bool,
) -> Result<WriteResult, SyncError> {
    let output = generator.generate(&pending.artifact)?;

    if dry_run {
        tracing::info!(
            "[dry-run] would write ({}): {}",
            pending.change,
            output.path.display()
        );
        return Ok(WriteResult::WouldWrite { path: output.path });
    }

    atomic_write(&output.path, &output.contents)?;
    store.put(&pending.artifact.location, &pending.fingerprint)?;

    tracing::info!("wrote ({}): {}", pending.change, output.path.display());
    Ok(WriteResult::Written { path: output.path })
}

/// Atomically write `content` to `path` via a `.stencil.tmp` sibling.
pub(crate) fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    // Normalise line endings to LF before writing.
    let content = content.replace("\r\n", "\n");

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let tmp = PathBuf::from(format!("{}.stencil.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
