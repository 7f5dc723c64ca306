//! # Cryptographic Error Types
//!
//! Structured errors for key handling and the key store.

use thiserror::Error;

/// Errors from key parsing, signing and verification.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("Ed25519 verification failed: {0}")]
    VerificationFailed(String),

    /// A seed could not be decoded.
    #[error("invalid seed: {0}")]
    InvalidSeed(String),

    /// A public key could not be decoded or is not a valid curve point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Invalid Ed25519 signature encoding.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// Errors from [`KeyMaterialStore`](crate::KeyMaterialStore) implementations.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    /// No private key is held for the requested public identity.
    #[error("no private key found for {0}")]
    KeyNotFound(String),

    /// The reference is not a seed, a known public key, or a readable file.
    #[error("unable to resolve key reference {reference:?}: {reason}")]
    UnresolvableReference {
        /// What the caller passed in.
        reference: String,
        /// Why it could not be resolved.
        reason: String,
    },

    /// Key decoding failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// I/O error reading or writing key files.
    #[error("key store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl KeyStoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
