//! # Claim Errors

use thiserror::Error;

use crate::claim::ClaimKind;

/// Errors from building, validating, signing and verifying claims.
#[derive(Error, Debug)]
pub enum ClaimError {
    /// The claim has a different kind than the operation requires.
    #[error("claim kind mismatch: expected {expected}, found {actual}")]
    WrongKind {
        /// Kind the caller needed.
        expected: ClaimKind,
        /// Kind the claim actually has.
        actual: ClaimKind,
    },

    /// A field value failed syntax validation.
    #[error("invalid {field} {value:?}: {reason}")]
    InvalidField {
        /// Field name as shown to users.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The key offered for signing is not the claim's issuer.
    #[error("claim issuer is {issuer} but the signing key is {key}")]
    IssuerMismatch {
        /// The `iss` recorded on the claim.
        issuer: String,
        /// The public identity of the offered key.
        key: String,
    },

    /// The recorded `jti` does not match the claim content.
    #[error("claim id mismatch: recorded {recorded}, computed {computed}")]
    JtiMismatch {
        /// `jti` stored on the claim.
        recorded: String,
        /// `jti` recomputed from the content.
        computed: String,
    },

    /// Canonicalization failed.
    #[error(transparent)]
    Core(#[from] nsc_core::CoreError),

    /// Signing or verification failed.
    #[error(transparent)]
    Crypto(#[from] nsc_crypto::CryptoError),

    /// The token is not valid JSON for a claim.
    #[error("malformed claim token: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClaimError {
    pub(crate) fn invalid(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<nsc_core::CanonicalizationError> for ClaimError {
    fn from(e: nsc_core::CanonicalizationError) -> Self {
        Self::Core(e.into())
    }
}
