//! Domain types for the Stencil synchronizer.
//!
//! A [`Location`] is the canonical string identity of a source artifact; it is
//! the unique key of the state table and is always stored with forward
//! slashes, regardless of platform.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed, normalized artifact location (state-table key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location(pub String);

impl Location {
    /// Normalize a filesystem path into a location string.
    pub fn from_path(path: &Path) -> Self {
        Self(path.to_string_lossy().replace('\\', "/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Prefix containment, e.g. `cleanup("lib/")` matching `lib/a.jslib`.
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// The filesystem path this location refers to.
    pub fn to_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Location {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A hex-encoded content digest, used only for equality comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Artifact kinds
// ---------------------------------------------------------------------------

/// The closed set of artifact dialects the synchronizer tracks.
///
/// Each kind supplies its own scan filter (`matches_name`) and its own
/// deterministic output mapping (`output_location` / `output_path`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Script library (`*.jslib`) — generates an `.exports.js` binding stub.
    ScriptLib,
    /// Table definition (`*.schema.json`) — generates a `.sql` DDL file.
    Schema,
}

const SCRIPT_LIB_SUFFIX: &str = ".jslib";
const SCRIPT_LIB_OUTPUT_SUFFIX: &str = ".exports.js";
const SCHEMA_SUFFIX: &str = ".schema.json";
const SCHEMA_OUTPUT_SUFFIX: &str = ".sql";

impl ArtifactKind {
    pub fn all() -> &'static [ArtifactKind] {
        &[ArtifactKind::ScriptLib, ArtifactKind::Schema]
    }

    /// Whether a bare file name belongs to this kind.
    pub fn matches_name(&self, name: &str) -> bool {
        name.ends_with(self.source_suffix())
    }

    /// The kind a file name belongs to, if any.
    pub fn for_name(name: &str) -> Option<ArtifactKind> {
        Self::all().iter().copied().find(|k| k.matches_name(name))
    }

    /// The kind of a stored location, derived from its trailing suffix.
    pub fn for_location(location: &Location) -> Option<ArtifactKind> {
        Self::for_name(location.as_str())
    }

    pub fn source_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::ScriptLib => SCRIPT_LIB_SUFFIX,
            ArtifactKind::Schema => SCHEMA_SUFFIX,
        }
    }

    pub fn output_suffix(&self) -> &'static str {
        match self {
            ArtifactKind::ScriptLib => SCRIPT_LIB_OUTPUT_SUFFIX,
            ArtifactKind::Schema => SCHEMA_OUTPUT_SUFFIX,
        }
    }

    /// Rewrite a source name into its generated-output name.
    ///
    /// Returns `None` when the name does not carry this kind's suffix.
    pub fn output_name(&self, name: &str) -> Option<String> {
        name.strip_suffix(self.source_suffix())
            .map(|stem| format!("{stem}{}", self.output_suffix()))
    }

    /// Deterministic output location derived from a source location.
    pub fn output_location(&self, location: &Location) -> Option<Location> {
        self.output_name(location.as_str()).map(Location)
    }

    /// Deterministic output path derived from a source path.
    pub fn output_path(&self, path: &Path) -> Option<PathBuf> {
        let name = path.file_name()?.to_string_lossy();
        let rewritten = self.output_name(&name)?;
        Some(path.with_file_name(rewritten))
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::ScriptLib => write!(f, "scriptlib"),
            ArtifactKind::Schema => write!(f, "schema"),
        }
    }
}

// ---------------------------------------------------------------------------
// Scan-time artifact
// ---------------------------------------------------------------------------

/// One source artifact observed by a scan. Owned by a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub location: Location,
    /// Absolute filesystem path the contents were read from.
    pub path: PathBuf,
    pub kind: ArtifactKind,
    pub contents: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
