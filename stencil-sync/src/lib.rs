//! # stencil-sync
//!
//! Incremental synchronization over one or more artifact trees: classify
//! each scanned artifact against the state table, regenerate output for the
//! changed set, and prune state for artifacts that disappeared.
//!
//! Call [`pipeline::run`] for a full pass, or [`cleanup_prefix`] for an
//! explicit scanner-independent folder cleanup.

pub mod classifier;
pub mod cleanup;
pub mod error;
pub mod pipeline;
pub mod writer;

pub use classifier::{classify, ChangeKind, Classified, PendingArtifact};
pub use cleanup::{cleanup_prefix, cleanup_removed, CleanupOutcome};
pub use error::SyncError;
pub use pipeline::{run, run_pass, SyncScope};
pub use writer::WriteResult;
