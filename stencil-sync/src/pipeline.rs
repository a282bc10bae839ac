//! The synchronization pass pipeline shared by CLI and daemon.
//!
//! One pass per root: scan → classify → generate pending → prune removed.
//! Per-artifact failures are recorded in the [`PassReport`] and never abort
//! the pass; state-table failures do.

use std::path::{Path, PathBuf};

use chrono::Utc;

use stencil_core::{
    config,
    report::{FailureStage, PassFailure, PassReport},
    state::{SqliteStateStore, StateStore},
    types::{ArtifactKind, Location},
};
use stencil_gen::Generator;

use crate::classifier::{self, root_prefix};
use crate::cleanup;
use crate::error::SyncError;
use crate::writer;

/// Scope for a sync pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Synchronize every configured scan root.
    All,
    /// Synchronize a single root.
    Root(PathBuf),
}

/// Run the sync pipeline for a scope, composing the store and generator.
///
/// This is the canonical entrypoint for both `stencil sync` and the daemon's
/// scheduled job. [`run_pass`] is the explicit-dependency seam underneath it.
pub fn run(home: &Path, scope: SyncScope, dry_run: bool) -> Result<PassReport, SyncError> {
    let started_at = Utc::now();
    let store = SqliteStateStore::open_at(home)?;
    let generator = Generator::new()?;

    let roots = match scope {
        SyncScope::Root(root) => vec![root],
        SyncScope::All => config::load_at(home)?.roots,
    };

    let mut report = PassReport::new(started_at);
    for root in &roots {
        report.absorb(run_pass(&store, &generator, root, dry_run)?);
    }
    Ok(report)
}

/// Run one pass over one root against explicit dependencies.
pub fn run_pass(
    store: &dyn StateStore,
    generator: &Generator,
    root: &Path,
    dry_run: bool,
) -> Result<PassReport, SyncError> {
    let mut report = PassReport::new(Utc::now());

    let scan = stencil_scanner::scan(root, ArtifactKind::all());
    let classified = classifier::classify(store, &root_prefix(root), scan)?;

    report.scanned = classified.pending.len() + classified.unchanged.len();
    report.unchanged = classified.unchanged.len();
    for failure in classified.failures {
        tracing::warn!("scan failure: {}", failure);
        report.failures.push(PassFailure {
            location: Location::from_path(&failure.path),
            stage: FailureStage::Scan,
            message: failure.message,
        });
    }

    for pending in &classified.pending {
        match writer::generate_pending(store, generator, pending, dry_run) {
            Ok(_) => report.generated += 1,
            // The state table going away is fatal; a bad artifact is not.
            Err(SyncError::Store(err)) => return Err(SyncError::Store(err)),
            Err(err) => {
                tracing::warn!("generation failed for {}: {}", pending.artifact.location, err);
                report.failures.push(PassFailure {
                    location: pending.artifact.location.clone(),
                    stage: FailureStage::Generate,
                    message: err.to_string(),
                });
            }
        }
    }

    let pruned = cleanup::cleanup_removed(store, &classified.removed, dry_run)?;
    report.removed = pruned.removed;
    report.failures.extend(pruned.failures);

    tracing::debug!(
        "pass over {} done: {} scanned, {} generated, {} unchanged, {} removed, {} failed",
        root.display(),
        report.scanned,
        report.generated,
        report.unchanged,
        report.removed,
        report.failures.len()
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use tempfile::TempDir;

    use stencil_core::state::SqliteStateStore;

    fn parts() -> (SqliteStateStore, Generator) {
        (
            SqliteStateStore::in_memory().unwrap(),
            Generator::new().unwrap(),
        )
    }

    #[test]
    fn first_pass_generates_everything() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.jslib"), "function a() {\n}\n").unwrap();
        fs::write(
            root.path().join("t.schema.json"),
            r#"{"table": "T", "columns": [{"name": "C", "type": "INTEGER"}]}"#,
        )
        .unwrap();

        let (store, generator) = parts();
        let report = run_pass(&store, &generator, root.path(), false).unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.generated, 2);
        assert_eq!(report.unchanged, 0);
        assert!(report.is_clean());
        assert!(root.path().join("a.exports.js").exists());
        assert!(root.path().join("t.sql").exists());
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("a.jslib"), "function a() {\n}\n").unwrap();

        let (store, generator) = parts();
        run_pass(&store, &generator, root.path(), false).unwrap();
        let second = run_pass(&store, &generator, root.path(), false).unwrap();

        assert_eq!(second.generated, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.removed, 0);
    }

    #[test]
    fn bad_artifact_does_not_abort_the_pass() {
        let root = TempDir::new().unwrap();
        fs::write(root.path().join("good.jslib"), "function g() {\n}\n").unwrap();
        fs::write(root.path().join("bad.schema.json"), "{ broken").unwrap();

        let (store, generator) = parts();
        let report = run_pass(&store, &generator, root.path(), false).unwrap();

        assert_eq!(report.generated, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].stage, FailureStage::Generate);
        assert!(root.path().join("good.exports.js").exists());
        assert!(!root.path().join("bad.sql").exists());

        // The failed artifact retries next pass: nothing was committed.
        let location = Location::from_path(&root.path().join("bad.schema.json"));
        assert_eq!(store.get(&location).unwrap(), None);
    }

    #[test]
    fn run_all_with_no_roots_configured_is_empty() {
        let home = TempDir::new().unwrap();
        let report = run(home.path(), SyncScope::All, false).unwrap();
        assert_eq!(report.scanned, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn run_aggregates_multiple_roots() {
        let home = TempDir::new().unwrap();
        let tree_a = TempDir::new().unwrap();
        let tree_b = TempDir::new().unwrap();
        fs::write(tree_a.path().join("a.jslib"), "function a() {\n}\n").unwrap();
        fs::write(tree_b.path().join("b.jslib"), "function b() {\n}\n").unwrap();

        let mut cfg = config::Config::default();
        cfg.add_root(tree_a.path().to_path_buf());
        cfg.add_root(tree_b.path().to_path_buf());
        config::save_at(home.path(), &cfg).unwrap();

        let report = run(home.path(), SyncScope::All, false).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.generated, 2);
    }
}
