//! Synchronization pass reports.
//!
//! One [`PassReport`] is produced per trigger firing. It is the only
//! observable side channel of a pass besides the filesystem and state-table
//! effects themselves, so it is serializable for the daemon control socket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Location;

/// Pipeline stage a per-artifact failure occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Scan,
    Generate,
    Cleanup,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Scan => write!(f, "scan"),
            FailureStage::Generate => write!(f, "generate"),
            FailureStage::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// One artifact that could not be processed during a pass.
///
/// Per-artifact failures never abort a pass; the artifact is retried on the
/// next firing because its state-table entry was left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassFailure {
    pub location: Location,
    pub stage: FailureStage,
    pub message: String,
}

/// Summary of one synchronization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    /// Artifacts the scan yielded (readable ones, any classification).
    pub scanned: usize,
    /// New or modified artifacts whose output was (re)generated.
    pub generated: usize,
    /// Artifacts skipped because their fingerprint matched the stored one.
    pub unchanged: usize,
    /// Records pruned because their artifact disappeared from the tree.
    pub removed: usize,
    pub failures: Vec<PassFailure>,
}

impl PassReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            scanned: 0,
            generated: 0,
            unchanged: 0,
            removed: 0,
            failures: Vec::new(),
        }
    }

    /// Fold a per-root report into an aggregate covering several roots.
    pub fn absorb(&mut self, other: PassReport) {
        self.scanned += other.scanned;
        self.generated += other.generated;
        self.unchanged += other.unchanged;
        self.removed += other.removed;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
