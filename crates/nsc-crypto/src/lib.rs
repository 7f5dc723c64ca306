//! # nsc-crypto — Key Material
//!
//! Ed25519 key pairs bound to a [`KeyRole`](nsc_core::KeyRole), the seed
//! text encoding used on disk and on the command line, and the
//! [`KeyMaterialStore`] trait through which the edit path finds private keys.
//!
//! ## Security Invariants
//!
//! - Signing input is always `&CanonicalBytes`.
//! - Seeds are never logged. `KeyPair` does not implement `Serialize` and its
//!   `Debug` output shows only the public identity.
//! - Seed text read from disk or flags is held in `Zeroizing` buffers.

pub mod ed25519;
pub mod error;
pub mod keystore;

pub use ed25519::{Ed25519Signature, KeyPair};
pub use error::{CryptoError, KeyStoreError};
pub use keystore::{FsKeyStore, KeyMaterialStore, MemoryKeyStore, MigrationReport};
