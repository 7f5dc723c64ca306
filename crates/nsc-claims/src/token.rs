//! # Claim Tokens
//!
//! The persisted form of a claim: the claim and an Ed25519 signature over
//! its canonical bytes, by the key named in `iss`.
//!
//! ## Security Invariants
//!
//! - [`ClaimToken::sign()`] refuses a key whose identity differs from
//!   `claim.iss`. Callers stamp the issuer first, then sign.
//! - [`ClaimToken::verify()`] checks the signature against `iss` and the
//!   recorded `jti` against the content. A token that fails either is never
//!   returned as a claim.

use nsc_crypto::ed25519::verify;
use nsc_crypto::{Ed25519Signature, KeyPair};
use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::error::ClaimError;

/// A signed claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClaimToken {
    /// The signed claim.
    pub claim: Claim,
    /// Signature by `claim.iss` over the claim's canonical bytes.
    pub signature: Ed25519Signature,
}

impl ClaimToken {
    /// Sign a stamped claim with the issuer's key.
    pub fn sign(claim: Claim, key: &KeyPair) -> Result<Self, ClaimError> {
        let key_id = key.public_identity();
        if key_id != claim.iss {
            return Err(ClaimError::IssuerMismatch {
                issuer: claim.iss.to_string(),
                key: key_id.to_string(),
            });
        }
        let signature = key.sign(&claim.signing_input()?);
        Ok(Self { claim, signature })
    }

    /// Verify the signature and `jti`, returning the claim.
    pub fn verify(&self) -> Result<&Claim, ClaimError> {
        verify(&self.claim.iss, &self.claim.signing_input()?, &self.signature)?;
        let computed = self.claim.compute_jti()?;
        if computed != self.claim.jti {
            return Err(ClaimError::JtiMismatch {
                recorded: self.claim.jti.clone(),
                computed,
            });
        }
        Ok(&self.claim)
    }

    /// Verify and take ownership of the claim.
    pub fn into_verified(self) -> Result<Claim, ClaimError> {
        self.verify()?;
        Ok(self.claim)
    }

    /// Encode for storage.
    pub fn encode(&self) -> Result<Vec<u8>, ClaimError> {
        let mut out = serde_json::to_vec_pretty(self)?;
        out.push(b'\n');
        Ok(out)
    }

    /// Decode from storage. Does not verify.
    pub fn decode(bytes: &[u8]) -> Result<Self, ClaimError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
