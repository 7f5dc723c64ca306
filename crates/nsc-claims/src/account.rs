//! # Account Claim Payload

use std::collections::BTreeSet;

use nsc_core::PublicIdentity;
use serde::{Deserialize, Serialize};

/// Payload of an account claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPayload {
    /// Keys, besides the account's own, allowed to sign user claims.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub signing_keys: BTreeSet<PublicIdentity>,
}

impl AccountPayload {
    /// Whether `key` is a declared signing key.
    pub fn has_signing_key(&self, key: &PublicIdentity) -> bool {
        self.signing_keys.contains(key)
    }
}
