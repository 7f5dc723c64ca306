//! # Operator Claim Payload
//!
//! The operator claim is self-signed and carries the format version of the
//! whole credential store.

use std::collections::BTreeSet;

use nsc_core::PublicIdentity;
use serde::{Deserialize, Serialize};

/// Store format version written by this release.
pub const CURRENT_VERSION: u32 = 2;

/// Payload of an operator claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorPayload {
    /// Keys, besides the operator's own, allowed to sign account claims.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub signing_keys: BTreeSet<PublicIdentity>,

    /// Store format version. `0` for stores written before versioning.
    #[serde(default)]
    pub version: u32,

    /// Where account claims are pushed, if the operator runs an account
    /// server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_server_url: Option<String>,
}

impl OperatorPayload {
    /// A payload stamped with [`CURRENT_VERSION`].
    pub fn current() -> Self {
        Self {
            version: CURRENT_VERSION,
            ..Self::default()
        }
    }
}
