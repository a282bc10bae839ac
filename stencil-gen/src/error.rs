//! Error types for stencil-gen.

use thiserror::Error;

use stencil_core::types::Location;

/// All errors that can arise from generation transforms.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Artifact bytes are not valid UTF-8.
    #[error("artifact at {location} is not valid UTF-8")]
    Utf8 { location: Location },

    /// Table definition JSON failed to parse.
    #[error("invalid table definition at {location}: {source}")]
    Json {
        location: Location,
        #[source]
        source: serde_json::Error,
    },

    /// Table definition parsed but violates the dialect's rules.
    #[error("invalid table definition at {location}: {message}")]
    Schema { location: Location, message: String },

    /// The artifact's location does not carry the suffix its kind requires.
    #[error("location {location} does not match the {kind} suffix")]
    Location {
        location: Location,
        kind: stencil_core::types::ArtifactKind,
    },
}
