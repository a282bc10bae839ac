//! Stencil core library — domain types, content fingerprinting, state table,
//! configuration.
//!
//! Public API surface:
//! - [`types`] — newtypes, artifact kinds, scan-time artifacts
//! - [`digest`] — content fingerprinting
//! - [`state`] — [`StateStore`] contract and SQLite implementation
//! - [`report`] — per-pass result reporting
//! - [`config`] — scan-root configuration persistence
//! - [`error`] — [`StoreError`], [`ConfigError`]

pub mod config;
pub mod digest;
pub mod error;
pub mod report;
pub mod state;
pub mod types;

pub use error::{ConfigError, StoreError};
pub use report::{FailureStage, PassFailure, PassReport};
pub use state::{SqliteStateStore, StateStore};
pub use types::{Artifact, ArtifactKind, Fingerprint, Location};
