//! # nsc-claims — Claim Documents
//!
//! Every credential in the trust chain is a [`Claim`]: one envelope
//! (`jti`, `iat`, `iss`, `sub`, `name`, validity window, `issuer_account`)
//! with a kind-specific [`ClaimPayload`]. A [`ClaimToken`] is the persisted
//! form, the claim plus an Ed25519 signature over its canonical bytes.
//!
//! ```text
//! operator ──signs──▶ account ──signs──▶ user
//!                        │
//!                        └─ signing_keys ──sign──▶ user (issuer_account = account)
//! ```
//!
//! The payload types validate their own field syntax (CIDRs, time ranges,
//! locales, connection types). Mutation policy lives in `nsc-edit`.

pub mod account;
pub mod claim;
pub mod error;
pub mod operator;
pub mod token;
pub mod user;

pub use account::AccountPayload;
pub use claim::{Claim, ClaimKind, ClaimPayload};
pub use error::ClaimError;
pub use operator::OperatorPayload;
pub use token::ClaimToken;
pub use user::{
    ConnectionType, Permission, ResponsePermission, TimeRange, UserLimits, UserPayload,
};
