//! # Claim Digests
//!
//! SHA-256 over canonical bytes. Used to derive a claim's `jti` so that two
//! claims with identical bodies share an identifier and any edit changes it.

use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// Compute the SHA-256 digest of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, never raw `&[u8]`.
pub fn sha256_digest(data: &CanonicalBytes) -> [u8; 32] {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    bytes
}

/// SHA-256 of canonical bytes rendered as upper-case hex.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).iter().map(|b| format!("{b:02X}")).collect()
}
