//! Error types for stencil-sync.

use std::path::PathBuf;

use thiserror::Error;

use stencil_core::error::{ConfigError, StoreError};
use stencil_gen::GenerateError;

/// All errors that can arise from sync operations.
///
/// [`SyncError::Store`] is fatal to a pass; everything else is recorded
/// against the artifact that caused it and the pass continues.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the generation engine.
    #[error("generate error: {0}")]
    Generate(#[from] GenerateError),

    /// An error from the state table.
    #[error("state table error: {0}")]
    Store(#[from] StoreError),

    /// An error loading the scan-root configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
