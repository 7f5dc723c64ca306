//! # Error Types
//!
//! Errors shared by every crate in the workspace. Higher layers wrap these
//! with `#[from]` so the original context (the offending value and the
//! reason it was rejected) survives up to the CLI.

use thiserror::Error;

/// Top-level error type for `nsc-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Text that should be a role-prefixed public key is not one.
    #[error("invalid public identity {value:?}: {reason}")]
    InvalidIdentity {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A user-supplied value (expiry, duration, size) failed to parse.
    #[error("invalid {kind} {value:?}: {reason}")]
    InvalidValue {
        /// What was being parsed ("expiry", "duration", "data size").
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl CoreError {
    pub(crate) fn invalid_value(kind: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            kind,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display_names_kind_and_input() {
        let err = CoreError::invalid_value("data size", "12Q", "unknown unit");
        let msg = err.to_string();
        assert!(msg.contains("data size"));
        assert!(msg.contains("\"12Q\""));
        assert!(msg.contains("unknown unit"));
    }

    #[test]
    fn canonicalization_converts() {
        let err: CoreError = CanonicalizationError::FloatRejected(0.5).into();
        assert!(err.to_string().contains("0.5"));
    }
}
