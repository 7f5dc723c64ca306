//! # Ed25519 Key Pairs and Seeds
//!
//! A [`KeyPair`] is an Ed25519 signing key bound to the role it plays in the
//! trust chain. Its public half is a [`PublicIdentity`]; its private half is
//! exchanged as seed text:
//!
//! ```text
//! S A 3F9C…(64 hex)
//! │ │ └── 32-byte Ed25519 seed
//! │ └──── role prefix (O, A, U)
//! └────── seed marker
//! ```
//!
//! ## Security Invariants
//!
//! - Signing input MUST be `&CanonicalBytes`.
//! - `KeyPair` does not implement `Serialize`; `Debug` prints only the
//!   public identity.
//! - Seed text is returned in `Zeroizing<String>` so it is wiped on drop.

use ed25519_dalek::{Signer, Verifier};
use nsc_core::identity::{hex_to_bytes, to_hex_upper};
use nsc_core::{CanonicalBytes, KeyRole, PublicIdentity};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// Length of encoded seed text: `S` + role prefix + 64 hex characters.
pub const SEED_LEN: usize = 66;

/// An Ed25519 signature (64 bytes). Serializes as upper-case hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair with its trust-chain role.
pub struct KeyPair {
    role: KeyRole,
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

impl KeyPair {
    /// Generate a new random key pair for `role`.
    pub fn generate(role: KeyRole) -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            role,
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build a key pair from a raw 32-byte seed.
    pub fn from_raw_seed(role: KeyRole, seed: &[u8; 32]) -> Self {
        Self {
            role,
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Decode seed text (`S` + role prefix + 64 hex).
    pub fn from_seed(seed: &str) -> Result<Self, CryptoError> {
        let seed = seed.trim();
        let mut chars = seed.chars();
        if chars.next().map(|c| c.to_ascii_uppercase()) != Some('S') {
            return Err(CryptoError::InvalidSeed("seed must start with 'S'".to_string()));
        }
        let role = chars
            .next()
            .and_then(|c| KeyRole::from_prefix(c.to_ascii_uppercase()))
            .ok_or_else(|| CryptoError::InvalidSeed("unknown role prefix".to_string()))?;
        let hex = chars.as_str();
        if hex.len() != 64 {
            return Err(CryptoError::InvalidSeed(format!(
                "expected 64 hex characters after the prefix, got {}",
                hex.len()
            )));
        }
        let bytes = Zeroizing::new(hex_to_bytes(hex).map_err(CryptoError::InvalidSeed)?);
        let mut raw = Zeroizing::new([0u8; 32]);
        raw.copy_from_slice(&bytes);
        Ok(Self::from_raw_seed(role, &raw))
    }

    /// Whether `text` looks like seed text of any role.
    pub fn is_seed(text: &str) -> bool {
        let t = text.trim();
        t.len() == SEED_LEN && t.starts_with(['S', 's']) && Self::from_seed(t).is_ok()
    }

    /// Encode the private half as seed text.
    pub fn seed(&self) -> Zeroizing<String> {
        let raw = Zeroizing::new(self.signing_key.to_bytes());
        let mut s = Zeroizing::new(String::with_capacity(SEED_LEN));
        s.push('S');
        s.push(self.role.prefix());
        s.push_str(&to_hex_upper(&raw[..]));
        s
    }

    /// The role this key plays.
    pub fn role(&self) -> KeyRole {
        self.role
    }

    /// The public identity of this key.
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity::from_key_bytes(self.role, self.signing_key.verifying_key().as_bytes())
    }

    /// Sign canonicalized data.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        let sig = self.signing_key.sign(data.as_bytes());
        Ed25519Signature(sig.to_bytes())
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("role", &self.role)
            .field("public", &self.public_identity().as_str())
            .finish_non_exhaustive()
    }
}

/// Verify a signature over canonical bytes against a public identity.
pub fn verify(
    signer: &PublicIdentity,
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
) -> Result<(), CryptoError> {
    let vk = ed25519_dalek::VerifyingKey::from_bytes(&signer.key_bytes())
        .map_err(|e| CryptoError::InvalidPublicKey(format!("{signer}: {e}")))?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    /// Render as upper-case hex.
    pub fn to_hex(&self) -> String {
        to_hex_upper(&self.0)
    }

    /// Parse a 128-character hex signature.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        let hex = hex.trim();
        if hex.len() != 128 {
            return Err(CryptoError::InvalidSignature(format!(
                "signature hex must be 128 chars, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(hex).map_err(CryptoError::InvalidSignature)?;
        let mut arr = [0u8; 64];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical(v: serde_json::Value) -> CanonicalBytes {
        CanonicalBytes::new(&v).unwrap()
    }

    #[test]
    fn seed_roundtrip_preserves_identity() {
        let kp = KeyPair::generate(KeyRole::Account);
        let seed = kp.seed();
        assert!(seed.starts_with("SA"));
        assert_eq!(seed.len(), SEED_LEN);
        let restored = KeyPair::from_seed(&seed).unwrap();
        assert_eq!(restored.public_identity(), kp.public_identity());
        assert_eq!(restored.role(), KeyRole::Account);
    }

    #[test]
    fn public_identity_carries_role() {
        assert!(KeyPair::generate(KeyRole::Operator).public_identity().as_str().starts_with('O'));
        assert!(KeyPair::generate(KeyRole::User).public_identity().as_str().starts_with('U'));
    }

    #[test]
    fn from_seed_rejects_garbage() {
        assert!(KeyPair::from_seed("").is_err());
        assert!(KeyPair::from_seed("XA00").is_err());
        assert!(KeyPair::from_seed(&format!("SQ{}", "00".repeat(32))).is_err());
        assert!(KeyPair::from_seed(&format!("SA{}", "00".repeat(31))).is_err());
    }

    #[test]
    fn is_seed_distinguishes_public_keys() {
        let kp = KeyPair::generate(KeyRole::Account);
        assert!(KeyPair::is_seed(&kp.seed()));
        assert!(!KeyPair::is_seed(kp.public_identity().as_str()));
        assert!(!KeyPair::is_seed("/tmp/some/file.nk"));
    }

    #[test]
    fn sign_and_verify() {
        let kp = KeyPair::generate(KeyRole::Account);
        let data = canonical(json!({"sub": "U1", "n": 1}));
        let sig = kp.sign(&data);
        verify(&kp.public_identity(), &data, &sig).unwrap();
    }

    #[test]
    fn verify_rejects_other_key_and_tampered_data() {
        let kp = KeyPair::generate(KeyRole::Account);
        let other = KeyPair::generate(KeyRole::Account);
        let data = canonical(json!({"a": 1}));
        let sig = kp.sign(&data);
        assert!(verify(&other.public_identity(), &data, &sig).is_err());
        assert!(verify(&kp.public_identity(), &canonical(json!({"a": 2})), &sig).is_err());
    }

    #[test]
    fn signature_hex_serde() {
        let kp = KeyPair::generate(KeyRole::User);
        let sig = kp.sign(&canonical(json!({})));
        let json = serde_json::to_string(&sig).unwrap();
        let back: Ed25519Signature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
        assert!(Ed25519Signature::from_hex("ABCD").is_err());
    }

    #[test]
    fn debug_does_not_leak_seed() {
        let kp = KeyPair::generate(KeyRole::Account);
        let dbg = format!("{kp:?}");
        let seed = kp.seed();
        assert!(!dbg.contains(&seed[2..]));
        assert!(dbg.contains(kp.public_identity().as_str()));
    }
}
