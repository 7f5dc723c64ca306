//! # Store and Gate Errors

use thiserror::Error;

/// Errors from [`CredentialStore`](crate::CredentialStore) implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No claim exists at the requested location.
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// `operator`, `account` or `user`.
        kind: &'static str,
        /// The requested name.
        name: String,
    },

    /// A name cannot be used as a store path component.
    #[error("invalid name {0:?}: names must be non-empty and contain no path separators")]
    InvalidName(String),

    /// The stored token is malformed or does not verify.
    #[error("{path}: {source}")]
    Claim {
        /// Location of the bad token.
        path: String,
        /// The underlying claim error.
        source: nsc_claims::ClaimError,
    },

    /// The token at a location has the wrong claim kind.
    #[error("{path}: wrong claim kind, expected {expected}")]
    KindMismatch {
        /// Location of the token.
        path: String,
        /// Kind the location holds.
        expected: nsc_claims::ClaimKind,
    },

    /// I/O failure reading or writing the store.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// A command refused by the [`VersionGate`](crate::VersionGate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    /// The store is at the deprecated v1 format and the command is not on
    /// the allow-list.
    #[error("{remediation}")]
    StoreVersionBlocked {
        /// Store name.
        store: String,
        /// Multi-line instructions for upgrading the store.
        remediation: String,
    },

    /// The store was written by a newer release.
    #[error("the store \"{store}\" is at version {version}. To upgrade nsc - type \"{program} update\"")]
    StoreTooNew {
        /// Store name.
        store: String,
        /// Version found on disk.
        version: u32,
        /// Program name used in the instructions.
        program: String,
    },

    /// The key store uses a layout that must be migrated first.
    #[error("the keystore \"{location}\" needs migration - type \"{program} keys migrate\" to update")]
    KeystoreMigrationRequired {
        /// Key store location.
        location: String,
        /// Program name used in the instructions.
        program: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keystore_migration_message() {
        let err = GateError::KeystoreMigrationRequired {
            location: "~/.nkeys".to_string(),
            program: "nsc".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "the keystore \"~/.nkeys\" needs migration - type \"nsc keys migrate\" to update"
        );
    }

    #[test]
    fn store_too_new_message() {
        let err = GateError::StoreTooNew {
            store: "O".to_string(),
            version: 3,
            program: "nsc".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("version 3"));
        assert!(msg.contains("nsc update"));
    }

    #[test]
    fn not_found_display() {
        let err = StoreError::NotFound {
            kind: "user",
            name: "bob".to_string(),
        };
        assert_eq!(err.to_string(), "user \"bob\" not found");
    }
}
