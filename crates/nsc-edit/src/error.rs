//! # Edit Errors
//!
//! Every failure aborts the whole edit. Nothing is written until the
//! mutated claim has been signed, so any error here leaves the stored claim
//! as it was.

use nsc_claims::ClaimError;
use nsc_crypto::KeyStoreError;
use nsc_state::StoreError;
use thiserror::Error;

use crate::prompt::PromptError;

/// Errors from the edit and provisioning flows.
#[derive(Error, Debug)]
pub enum EditError {
    /// An edit was requested with no operations.
    #[error("specify an edit option")]
    NoEditSpecified,

    /// A user-supplied value is malformed.
    #[error("invalid {field} {value:?}: {reason}")]
    Validation {
        /// Field as shown to users.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An explicitly supplied key reference could not be used.
    #[error("unable to use signing key {reference}: {reason}")]
    KeyResolution {
        /// The reference, with seeds redacted.
        reference: String,
        /// Why it could not be used.
        reason: String,
    },

    /// No explicit key was given and no single held key can sign.
    #[error("no usable signing key for account {account:?}: {detail}")]
    NoUsableSigningKey {
        /// Account name.
        account: String,
        /// Candidates and what is wrong with them.
        detail: String,
    },

    /// Neither the operator key nor any operator signing key is held.
    #[error("no key for operator {operator:?} is in the key store")]
    OperatorKeyMissing {
        /// Operator name.
        operator: String,
    },

    /// The account could not be inferred.
    #[error("account is required")]
    AccountRequired,

    /// The named account does not exist.
    #[error("account {0:?} does not exist")]
    AccountNotFound(String),

    /// The user could not be inferred.
    #[error("user name is required")]
    UserNameRequired,

    /// The named user does not exist in the account.
    #[error("user {user:?} not found in account {account:?}")]
    UserNotFound {
        /// Account searched.
        account: String,
        /// The requested user.
        user: String,
    },

    /// A claim with that name already exists.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        /// `operator`, `account` or `user`.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// Interactive input failed or was cancelled.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// The signed claim could not be written.
    #[error("failed to save {path}: {source}")]
    Persistence {
        /// Where the claim was going.
        path: String,
        /// The underlying store error.
        source: StoreError,
    },

    /// Reading from the credential store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Building or signing a claim failed.
    #[error(transparent)]
    Claim(#[from] ClaimError),

    /// The key store failed.
    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}

impl EditError {
    pub(crate) fn validation(field: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Field-level claim validation surfaces as a validation error, keeping the
/// field and value.
pub(crate) fn from_claim_validation(e: ClaimError) -> EditError {
    match e {
        ClaimError::InvalidField { field, value, reason } => EditError::Validation { field, value, reason },
        other => EditError::Claim(other),
    }
}

impl From<nsc_core::CoreError> for EditError {
    fn from(e: nsc_core::CoreError) -> Self {
        match e {
            nsc_core::CoreError::InvalidValue { kind, value, reason } => Self::Validation {
                field: kind,
                value,
                reason,
            },
            other => Self::Claim(ClaimError::Core(other)),
        }
    }
}
