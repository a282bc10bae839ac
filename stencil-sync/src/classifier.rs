//! Change classification — joins one scan against the state table.
//!
//! Classification is fingerprint-equality only, never timestamps or file
//! metadata, so the result is independent of clock skew and a file rewritten
//! with identical bytes still counts as unchanged.

use std::collections::HashSet;
use std::path::Path;

use stencil_core::{
    digest,
    error::StoreError,
    state::StateStore,
    types::{Artifact, Fingerprint, Location},
};
use stencil_scanner::ScanFailure;

/// Why a pending artifact needs (re)generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No record exists for the location.
    New,
    /// A record exists with a different fingerprint.
    Modified,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::New => write!(f, "new"),
            ChangeKind::Modified => write!(f, "modified"),
        }
    }
}

/// A scanned artifact that needs its output (re)generated.
#[derive(Debug, Clone)]
pub struct PendingArtifact {
    pub artifact: Artifact,
    /// Fingerprint of the scanned content, committed to the state table only
    /// after the output write succeeds.
    pub fingerprint: Fingerprint,
    pub change: ChangeKind,
}

/// Outcome of classifying one scan.
#[derive(Debug, Default)]
pub struct Classified {
    pub pending: Vec<PendingArtifact>,
    pub unchanged: Vec<Location>,
    /// Stored locations under the scan root that the scan did not observe.
    pub removed: Vec<Location>,
    pub failures: Vec<ScanFailure>,
}

/// Location prefix that scopes Removed classification to one scan root.
///
/// A trailing slash keeps `/data/lib` from claiming records under
/// `/data/lib2`.
pub fn root_prefix(root: &Path) -> String {
    let mut prefix = Location::from_path(root).0;
    if !prefix.ends_with('/') {
        prefix.push('/');
    }
    prefix
}

/// Classify every scanned artifact and compute removals for the root.
///
/// Store read failures abort classification; scan failures are carried
/// through so the pass can report them without losing the rest of the tree.
pub fn classify<I>(
    store: &dyn StateStore,
    root_prefix: &str,
    scan: I,
) -> Result<Classified, StoreError>
where
    I: IntoIterator<Item = Result<Artifact, ScanFailure>>,
{
    let mut result = Classified::default();
    let mut seen = HashSet::new();

    for item in scan {
        let artifact = match item {
            Ok(artifact) => artifact,
            Err(failure) => {
                // An unreadable artifact still exists; shielding its location
                // keeps the Removed step from pruning live state.
                seen.insert(Location::from_path(&failure.path));
                result.failures.push(failure);
                continue;
            }
        };

        let fingerprint = digest::fingerprint(&artifact.contents);
        seen.insert(artifact.location.clone());

        match store.get(&artifact.location)? {
            None => result.pending.push(PendingArtifact {
                artifact,
                fingerprint,
                change: ChangeKind::New,
            }),
            Some(stored) if stored != fingerprint => result.pending.push(PendingArtifact {
                artifact,
                fingerprint,
                change: ChangeKind::Modified,
            }),
            Some(_) => result.unchanged.push(artifact.location),
        }
    }

    result.removed = store
        .locations_with_prefix(root_prefix)?
        .into_iter()
        .filter(|location| !seen.contains(location))
        .collect();

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use stencil_core::state::SqliteStateStore;
    use stencil_core::types::ArtifactKind;

    fn artifact(location: &str, contents: &str) -> Artifact {
        Artifact {
            location: Location::from(location),
            path: PathBuf::from(location),
            kind: ArtifactKind::ScriptLib,
            contents: contents.as_bytes().to_vec(),
        }
    }

    fn scan_of(artifacts: Vec<Artifact>) -> Vec<Result<Artifact, ScanFailure>> {
        artifacts.into_iter().map(Ok).collect()
    }

    #[test]
    fn unknown_location_is_new() {
        let store = SqliteStateStore::in_memory().unwrap();
        let classified =
            classify(&store, "lib/", scan_of(vec![artifact("lib/a.jslib", "v1")])).unwrap();
        assert_eq!(classified.pending.len(), 1);
        assert_eq!(classified.pending[0].change, ChangeKind::New);
        assert!(classified.unchanged.is_empty());
        assert!(classified.removed.is_empty());
    }

    #[test]
    fn matching_fingerprint_is_unchanged() {
        let store = SqliteStateStore::in_memory().unwrap();
        let a = artifact("lib/a.jslib", "v1");
        store
            .put(&a.location, &digest::fingerprint(&a.contents))
            .unwrap();

        let classified = classify(&store, "lib/", scan_of(vec![a])).unwrap();
        assert!(classified.pending.is_empty());
        assert_eq!(classified.unchanged, vec![Location::from("lib/a.jslib")]);
    }

    #[test]
    fn different_fingerprint_is_modified() {
        let store = SqliteStateStore::in_memory().unwrap();
        let old = artifact("lib/a.jslib", "v1");
        store
            .put(&old.location, &digest::fingerprint(&old.contents))
            .unwrap();

        let classified =
            classify(&store, "lib/", scan_of(vec![artifact("lib/a.jslib", "v2")])).unwrap();
        assert_eq!(classified.pending.len(), 1);
        assert_eq!(classified.pending[0].change, ChangeKind::Modified);
    }

    #[test]
    fn identical_bytes_rewritten_still_count_as_unchanged() {
        // Rewriting a file with the same content updates its metadata but not
        // its fingerprint; classification must not care.
        let store = SqliteStateStore::in_memory().unwrap();
        let a = artifact("lib/a.jslib", "same bytes");
        store
            .put(&a.location, &digest::fingerprint(&a.contents))
            .unwrap();

        let rewritten = artifact("lib/a.jslib", "same bytes");
        let classified = classify(&store, "lib/", scan_of(vec![rewritten])).unwrap();
        assert!(classified.pending.is_empty());
        assert_eq!(classified.unchanged.len(), 1);
    }

    #[test]
    fn stored_location_missing_from_scan_is_removed() {
        let store = SqliteStateStore::in_memory().unwrap();
        store
            .put(&Location::from("lib/gone.jslib"), &Fingerprint::from("aa"))
            .unwrap();
        store
            .put(&Location::from("lib/kept.jslib"), &Fingerprint::from("bb"))
            .unwrap();

        let classified = classify(
            &store,
            "lib/",
            scan_of(vec![artifact("lib/kept.jslib", "v1")]),
        )
        .unwrap();
        assert_eq!(classified.removed, vec![Location::from("lib/gone.jslib")]);
    }

    #[test]
    fn records_outside_the_root_are_not_removed() {
        let store = SqliteStateStore::in_memory().unwrap();
        store
            .put(&Location::from("other/b.jslib"), &Fingerprint::from("bb"))
            .unwrap();

        let classified = classify(&store, "lib/", scan_of(vec![])).unwrap();
        assert!(classified.removed.is_empty());
    }

    #[test]
    fn scan_failure_excludes_artifact_but_not_the_pass() {
        let store = SqliteStateStore::in_memory().unwrap();
        let scan: Vec<Result<Artifact, ScanFailure>> = vec![
            Err(ScanFailure {
                path: PathBuf::from("lib/locked.jslib"),
                message: "permission denied".to_string(),
            }),
            Ok(artifact("lib/ok.jslib", "v1")),
        ];

        let classified = classify(&store, "lib/", scan).unwrap();
        assert_eq!(classified.failures.len(), 1);
        assert_eq!(classified.pending.len(), 1);
    }

    #[test]
    fn unreadable_artifact_with_a_record_is_not_pruned() {
        // The failed artifact was not "observed", but pruning it would drop
        // state for a file that still exists. The scanner yields a failure
        // item for it, and classify must leave its record alone.
        let store = SqliteStateStore::in_memory().unwrap();
        store
            .put(&Location::from("lib/locked.jslib"), &Fingerprint::from("aa"))
            .unwrap();

        let scan: Vec<Result<Artifact, ScanFailure>> = vec![Err(ScanFailure {
            path: PathBuf::from("lib/locked.jslib"),
            message: "permission denied".to_string(),
        })];

        let classified = classify(&store, "lib/", scan).unwrap();
        assert!(
            classified.removed.is_empty(),
            "an unreadable artifact must not be classified Removed"
        );
    }

    #[test]
    fn root_prefix_gets_a_trailing_slash() {
        assert_eq!(root_prefix(Path::new("/data/lib")), "/data/lib/");
        assert_eq!(root_prefix(Path::new("/data/lib/")), "/data/lib/");
    }
}
