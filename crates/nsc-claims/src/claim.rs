//! # Claim Envelope
//!
//! One envelope type for all three kinds. The kind-specific part lives in
//! the tagged [`ClaimPayload`], serialized under `nats` with a `type`
//! discriminant:
//!
//! ```json
//! { "jti": "…", "iat": 1700000000, "iss": "A…", "sub": "U…", "name": "alice",
//!   "nats": { "type": "user", "tags": ["dev"], "limits": { … } } }
//! ```
//!
//! ## Identity
//!
//! `jti` is the upper-case SHA-256 of the canonical claim with `jti`
//! removed. Any content change, including `iat`, yields a new `jti`.

use nsc_core::{sha256_hex, CanonicalBytes, PublicIdentity};
use serde::{Deserialize, Serialize};

use crate::account::AccountPayload;
use crate::error::ClaimError;
use crate::operator::OperatorPayload;
use crate::user::UserPayload;

/// The three claim kinds of the trust chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimKind {
    /// Operator claim.
    Operator,
    /// Account claim.
    Account,
    /// User claim.
    User,
}

impl ClaimKind {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Account => "account",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific claim content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClaimPayload {
    /// Operator payload.
    Operator(OperatorPayload),
    /// Account payload.
    Account(AccountPayload),
    /// User payload.
    User(UserPayload),
}

impl ClaimPayload {
    /// The kind of this payload.
    pub fn kind(&self) -> ClaimKind {
        match self {
            Self::Operator(_) => ClaimKind::Operator,
            Self::Account(_) => ClaimKind::Account,
            Self::User(_) => ClaimKind::User,
        }
    }
}

/// A claim document, before or after signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Content identifier.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jti: String,

    /// Issued-at, epoch seconds.
    pub iat: i64,

    /// Identity whose key signs this claim.
    pub iss: PublicIdentity,

    /// Identity this claim describes.
    pub sub: PublicIdentity,

    /// Human-readable name.
    pub name: String,

    /// Not valid before, epoch seconds. `0` = unset.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub nbf: i64,

    /// Expires at, epoch seconds. `0` = unset.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub exp: i64,

    /// Account that delegated signing authority to `iss`. Set only when a
    /// user claim is signed by one of the account's signing keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_account: Option<PublicIdentity>,

    /// Kind-specific content.
    pub nats: ClaimPayload,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl Claim {
    /// Build an unsigned claim. `iss` starts out as the subject (self-signed)
    /// and is restamped by whoever signs it.
    pub fn new(name: impl Into<String>, sub: PublicIdentity, nats: ClaimPayload) -> Self {
        Self {
            jti: String::new(),
            iat: 0,
            iss: sub.clone(),
            sub,
            name: name.into(),
            nbf: 0,
            exp: 0,
            issuer_account: None,
            nats,
        }
    }

    /// The claim kind.
    pub fn kind(&self) -> ClaimKind {
        self.nats.kind()
    }

    fn wrong_kind(&self, expected: ClaimKind) -> ClaimError {
        ClaimError::WrongKind {
            expected,
            actual: self.kind(),
        }
    }

    /// The user payload, or `WrongKind`.
    pub fn user(&self) -> Result<&UserPayload, ClaimError> {
        match &self.nats {
            ClaimPayload::User(u) => Ok(u),
            _ => Err(self.wrong_kind(ClaimKind::User)),
        }
    }

    /// Mutable user payload, or `WrongKind`.
    pub fn user_mut(&mut self) -> Result<&mut UserPayload, ClaimError> {
        let actual = self.kind();
        match &mut self.nats {
            ClaimPayload::User(u) => Ok(u),
            _ => Err(ClaimError::WrongKind {
                expected: ClaimKind::User,
                actual,
            }),
        }
    }

    /// The account payload, or `WrongKind`.
    pub fn account(&self) -> Result<&AccountPayload, ClaimError> {
        match &self.nats {
            ClaimPayload::Account(a) => Ok(a),
            _ => Err(self.wrong_kind(ClaimKind::Account)),
        }
    }

    /// Mutable account payload, or `WrongKind`.
    pub fn account_mut(&mut self) -> Result<&mut AccountPayload, ClaimError> {
        let actual = self.kind();
        match &mut self.nats {
            ClaimPayload::Account(a) => Ok(a),
            _ => Err(ClaimError::WrongKind {
                expected: ClaimKind::Account,
                actual,
            }),
        }
    }

    /// The operator payload, or `WrongKind`.
    pub fn operator(&self) -> Result<&OperatorPayload, ClaimError> {
        match &self.nats {
            ClaimPayload::Operator(o) => Ok(o),
            _ => Err(self.wrong_kind(ClaimKind::Operator)),
        }
    }

    /// Mutable operator payload, or `WrongKind`.
    pub fn operator_mut(&mut self) -> Result<&mut OperatorPayload, ClaimError> {
        let actual = self.kind();
        match &mut self.nats {
            ClaimPayload::Operator(o) => Ok(o),
            _ => Err(ClaimError::WrongKind {
                expected: ClaimKind::Operator,
                actual,
            }),
        }
    }

    /// Whether `key` may sign claims on behalf of this account or operator:
    /// either the subject itself or a declared signing key. Always false for
    /// user claims.
    pub fn is_valid_signer(&self, key: &PublicIdentity) -> bool {
        if *key == self.sub {
            return !matches!(self.nats, ClaimPayload::User(_));
        }
        match &self.nats {
            ClaimPayload::Account(a) => a.signing_keys.contains(key),
            ClaimPayload::Operator(o) => o.signing_keys.contains(key),
            ClaimPayload::User(_) => false,
        }
    }

    /// Compute the content identifier: SHA-256 of the canonical claim
    /// without `jti`.
    pub fn compute_jti(&self) -> Result<String, ClaimError> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("jti");
        }
        let canonical = CanonicalBytes::from_value(value)?;
        Ok(sha256_hex(&canonical))
    }

    /// Refresh `iat` and `jti`.
    pub fn stamp(&mut self, iat: i64) -> Result<(), ClaimError> {
        self.iat = iat;
        self.jti = self.compute_jti()?;
        Ok(())
    }

    /// The bytes a signature covers.
    pub fn signing_input(&self) -> Result<CanonicalBytes, ClaimError> {
        Ok(CanonicalBytes::new(self)?)
    }
}
