//! Artifact scanner for `stencil-scanner`.
//!
//! [`scan`] walks a source tree and lazily yields every artifact whose file
//! name matches one of the requested kinds. The walk is finite, restartable
//! (re-invoking re-walks the current tree state; no cursor is persisted), and
//! ordered by file name so a single scan is deterministic.
//!
//! One unreadable entry never fails the whole scan: it is yielded as a
//! [`ScanFailure`] item and the walk continues.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use stencil_core::types::{Artifact, ArtifactKind, Location};

/// A single artifact (or directory entry) that could not be read.
#[derive(Debug, Error)]
#[error("unreadable entry at {path}: {message}")]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

/// Lazy artifact sequence over one source tree.
pub struct Scan {
    walker: Option<walkdir::IntoIter>,
    kinds: Vec<ArtifactKind>,
}

/// Scan `root` for artifacts of the given kinds.
///
/// A missing root yields an empty sequence: the tree's current state simply
/// contains no artifacts, which lets the classifier prune records for trees
/// that were deleted wholesale.
pub fn scan(root: &Path, kinds: &[ArtifactKind]) -> Scan {
    let walker = root
        .is_dir()
        .then(|| WalkDir::new(root).sort_by_file_name().into_iter());
    Scan {
        walker,
        kinds: kinds.to_vec(),
    }
}

impl Iterator for Scan {
    type Item = Result<Artifact, ScanFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        let walker = self.walker.as_mut()?;
        loop {
            let entry = match walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_default();
                    let message = err.to_string();
                    return Some(Err(ScanFailure { path, message }));
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let Some(kind) = ArtifactKind::for_name(&name) else {
                continue;
            };
            if !self.kinds.contains(&kind) {
                continue;
            }

            let path = entry.into_path();
            return Some(match std::fs::read(&path) {
                Ok(contents) => Ok(Artifact {
                    location: Location::from_path(&path),
                    path,
                    kind,
                    contents,
                }),
                Err(err) => Err(ScanFailure {
                    path,
                    message: err.to_string(),
                }),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    fn locations(scan: Scan) -> Vec<String> {
        scan.filter_map(Result::ok)
            .map(|a| a.location.as_str().to_string())
            .collect()
    }

    #[test]
    fn scan_yields_only_matching_kinds() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.jslib"), "").unwrap();
        fs::write(tree.path().join("t.schema.json"), "{}").unwrap();
        fs::write(tree.path().join("readme.md"), "").unwrap();
        fs::write(tree.path().join("plain.json"), "{}").unwrap();

        let found = locations(scan(tree.path(), ArtifactKind::all()));
        assert_eq!(found.len(), 2);
        assert!(found.iter().any(|l| l.ends_with("a.jslib")));
        assert!(found.iter().any(|l| l.ends_with("t.schema.json")));
    }

    #[rstest]
    #[case(ArtifactKind::ScriptLib, "a.jslib")]
    #[case(ArtifactKind::Schema, "t.schema.json")]
    fn kind_filter_restricts_the_sequence(#[case] kind: ArtifactKind, #[case] expected: &str) {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.jslib"), "").unwrap();
        fs::write(tree.path().join("t.schema.json"), "{}").unwrap();

        let found = locations(scan(tree.path(), &[kind]));
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with(expected));
    }

    #[test]
    fn scan_recurses_into_subdirectories() {
        let tree = TempDir::new().unwrap();
        let nested = tree.path().join("deep").join("er");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("n.jslib"), "").unwrap();

        let found = locations(scan(tree.path(), ArtifactKind::all()));
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("deep/er/n.jslib"));
    }

    #[test]
    fn rescanning_reflects_the_current_tree_state() {
        let tree = TempDir::new().unwrap();
        fs::write(tree.path().join("a.jslib"), "").unwrap();
        assert_eq!(locations(scan(tree.path(), ArtifactKind::all())).len(), 1);

        fs::remove_file(tree.path().join("a.jslib")).unwrap();
        fs::write(tree.path().join("b.jslib"), "").unwrap();
        let found = locations(scan(tree.path(), ArtifactKind::all()));
        assert_eq!(found.len(), 1);
        assert!(found[0].ends_with("b.jslib"));
    }

    #[test]
    fn ordering_is_stable_within_a_scan() {
        let tree = TempDir::new().unwrap();
        for name in ["z.jslib", "a.jslib", "m.jslib"] {
            fs::write(tree.path().join(name), "").unwrap();
        }
        let first = locations(scan(tree.path(), ArtifactKind::all()));
        let second = locations(scan(tree.path(), ArtifactKind::all()));
        assert_eq!(first, second);
    }

    #[test]
    fn missing_root_yields_an_empty_sequence() {
        let tree = TempDir::new().unwrap();
        let gone = tree.path().join("nope");
        assert!(locations(scan(&gone, ArtifactKind::all())).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_artifact_is_a_failure_item_not_a_failed_scan() {
        use std::os::unix::fs::PermissionsExt;

        let tree = TempDir::new().unwrap();
        let locked = tree.path().join("locked.jslib");
        fs::write(&locked, "function f() {\n}\n").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read(&locked).is_ok() {
            // Permission bits are not enforced for this user (root).
            return;
        }
        fs::write(tree.path().join("open.jslib"), "").unwrap();

        let items: Vec<_> = scan(tree.path(), ArtifactKind::all()).collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().filter(|i| i.is_err()).count(), 1);
        assert_eq!(items.iter().filter(|i| i.is_ok()).count(), 1);
    }
}
