//! # stencil-gen
//!
//! Pure generation transforms: parse an artifact's content and render its
//! derived output through embedded Tera templates. No filesystem writes
//! happen here — the sync layer owns output placement and state commits.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use stencil_gen::Generator;
//! use stencil_core::types::Artifact;
//!
//! fn render(artifact: &Artifact) {
//!     if let Ok(generator) = Generator::new() {
//!         if let Ok(output) = generator.generate(artifact) {
//!             println!("{}: {} bytes", output.location, output.contents.len());
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use engine::{GeneratedOutput, Generator};
pub use error::GenerateError;
