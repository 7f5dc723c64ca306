//! # nsc-core — Foundational Types for nsc
//!
//! The leaf of the workspace dependency graph. Defines the primitives every
//! other crate builds on:
//!
//! 1. **`CanonicalBytes`.** All signing input and every claim digest flows
//!    through `CanonicalBytes::new()`. No raw `serde_json::to_vec()` is ever
//!    signed.
//!
//! 2. **`PublicIdentity` and `KeyRole`.** Public keys travel as role-prefixed
//!    text (`O…`, `A…`, `U…`). The only constructor validates the prefix and
//!    the key length, so an account key can never be passed where a user key
//!    is expected without an explicit check.
//!
//! 3. **Value parsers.** Expiry expressions, durations and data sizes are
//!    parsed here once so the CLI and the interactive prompt agree on syntax.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `nsc-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod fsio;
pub mod identity;
pub mod temporal;
pub mod units;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex};
pub use error::{CanonicalizationError, CoreError};
pub use fsio::atomic_write;
pub use identity::{KeyRole, PublicIdentity};
pub use temporal::{
    format_duration, format_epoch, format_timestamp, parse_duration, parse_expiry, unix_now,
};
pub use units::{normalize_limit, parse_data_size, parse_limit, NO_LIMIT};
