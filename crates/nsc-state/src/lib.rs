//! # nsc-state — Credential Store and Version Gate
//!
//! Persists signed claims in a three-level hierarchy and decides, once per
//! command, whether the store is safe to operate on.
//!
//! ```text
//! <root>/<operator>/<operator>.json
//! <root>/<operator>/accounts/<account>/<account>.json
//! <root>/<operator>/accounts/<account>/users/<user>.json
//! ```
//!
//! ## Store Versions
//!
//! The operator claim records the store format version. The
//! [`VersionGate`] maps that version, together with the key store's layout
//! status, to an allow or block decision before any command runs.

pub mod error;
pub mod store;
pub mod version;

pub use error::{GateError, StoreError};
pub use store::{ClaimPath, CredentialStore, FsCredentialStore, MemoryCredentialStore};
pub use version::{CommandPath, GateDecision, KeystoreStatus, StoreStatus, StoreVersion, VersionGate};
