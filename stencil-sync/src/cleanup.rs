//! Cleanup worker — prunes state and generated output for vanished artifacts.
//!
//! Two entry points:
//! - [`cleanup_removed`] handles the Removed set of one pass;
//! - [`cleanup_prefix`] is the scanner-independent path for "a whole folder
//!   was deleted" requests.
//!
//! In both, a record is only dropped once its output is confirmed gone.
//! Missing output is fine (nothing to delete); a failed deletion keeps the
//! record so the orphaned file stays tracked and is retried next pass.

use std::io::ErrorKind;

use stencil_core::{
    report::{FailureStage, PassFailure},
    state::StateStore,
    types::{ArtifactKind, Location},
};

use crate::error::SyncError;

/// Outcome of pruning one pass's Removed set.
#[derive(Debug, Default)]
pub struct CleanupOutcome {
    pub removed: usize,
    pub failures: Vec<PassFailure>,
}

/// Delete generated output and state records for Removed locations.
///
/// Store failures are fatal; output-deletion failures are per-record.
pub fn cleanup_removed(
    store: &dyn StateStore,
    removed: &[Location],
    dry_run: bool,
) -> Result<CleanupOutcome, SyncError> {
    let mut outcome = CleanupOutcome::default();

    for location in removed {
        if dry_run {
            tracing::info!("[dry-run] would remove: {}", location);
            outcome.removed += 1;
            continue;
        }

        match delete_output(location) {
            Ok(()) => {
                store.delete(location)?;
                tracing::info!("removed: {}", location);
                outcome.removed += 1;
            }
            Err(err) => {
                tracing::warn!("output deletion failed for {}: {}", location, err);
                outcome.failures.push(PassFailure {
                    location: location.clone(),
                    stage: FailureStage::Cleanup,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(outcome)
}

/// Delete all generated output and state records under a location prefix.
///
/// Safe to call when nothing matches: returns 0. Records whose output could
/// not be deleted are kept for the next attempt.
pub fn cleanup_prefix(store: &dyn StateStore, prefix: &str) -> Result<usize, SyncError> {
    let locations = store.locations_with_prefix(prefix)?;

    let mut deletable = Vec::new();
    let mut kept = 0usize;
    for location in &locations {
        match delete_output(location) {
            Ok(()) => deletable.push(location),
            Err(err) => {
                tracing::warn!("output deletion failed for {}: {}", location, err);
                kept += 1;
            }
        }
    }

    // The prefix sweep also covers records the enumeration returned; fall
    // back to per-record deletes only when some outputs must stay tracked.
    let removed = if kept == 0 {
        store.delete_by_prefix(prefix)?
    } else {
        for location in &deletable {
            store.delete(location)?;
        }
        deletable.len()
    };

    if removed > 0 {
        tracing::info!("cleaned {} record(s) under {}", removed, prefix);
    }
    Ok(removed)
}

/// Remove the generated output derived from `location`, if any.
///
/// Missing output is not an error.
fn delete_output(location: &Location) -> std::io::Result<()> {
    let Some(kind) = ArtifactKind::for_location(location) else {
        return Ok(());
    };
    let Some(output) = kind.output_location(location) else {
        return Ok(());
    };
    match std::fs::remove_file(output.to_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
