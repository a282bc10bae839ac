//! Content fingerprinting.
//!
//! SHA-256 over the raw artifact bytes, hex-encoded. Fingerprints are used
//! only for change detection, never for security.

use sha2::{Digest, Sha256};

use crate::types::Fingerprint;

/// Compute the fingerprint of an artifact's bytes.
///
/// Deterministic: identical bytes always yield an identical digest.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    Fingerprint(hex::encode(hasher.finalize()))
}
