//! # Public Identities
//!
//! Every claim names its subject and issuer by public key. Keys travel as
//! text with a one-character role prefix followed by the 32-byte Ed25519
//! public key in upper-case hex:
//!
//! ```text
//! O4F1C…   operator
//! A09BE…   account
//! U77D2…   user
//! ```
//!
//! The role prefix makes cross-namespace confusion visible: an operator key
//! in an account's `signing_keys` is rejected at parse time by callers that
//! ask for a specific role.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Length of a public identity: role prefix + 64 hex characters.
pub const PUBLIC_IDENTITY_LEN: usize = 65;

/// The role a key pair plays in the trust chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    /// Root of trust; signs account claims.
    Operator,
    /// Signs user claims, directly or through delegated signing keys.
    Account,
    /// Leaf credential presented to the messaging fabric.
    User,
}

impl KeyRole {
    /// The prefix character used in public identities and seeds.
    pub fn prefix(&self) -> char {
        match self {
            Self::Operator => 'O',
            Self::Account => 'A',
            Self::User => 'U',
        }
    }

    /// Map a prefix character back to its role.
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'O' => Some(Self::Operator),
            'A' => Some(Self::Account),
            'U' => Some(Self::User),
            _ => None,
        }
    }

    /// Lower-case name, as used in store paths and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Account => "account",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for KeyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role-prefixed public key.
///
/// Constructed only through [`PublicIdentity::parse()`] or
/// [`PublicIdentity::from_key_bytes()`], both of which guarantee a valid
/// prefix and exactly 32 bytes of key material.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicIdentity(String);

impl PublicIdentity {
    /// Build an identity from a role and raw public key bytes.
    pub fn from_key_bytes(role: KeyRole, bytes: &[u8; 32]) -> Self {
        let mut s = String::with_capacity(PUBLIC_IDENTITY_LEN);
        s.push(role.prefix());
        s.push_str(&to_hex_upper(bytes));
        Self(s)
    }

    /// Parse a public identity from text. Surrounding whitespace is ignored
    /// and hex digits are accepted in either case.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        let invalid = |reason: &str| CoreError::InvalidIdentity {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = trimmed.chars();
        let prefix = chars.next().ok_or_else(|| invalid("empty"))?;
        let role = KeyRole::from_prefix(prefix.to_ascii_uppercase())
            .ok_or_else(|| invalid("unknown role prefix"))?;
        let hex = chars.as_str();
        if hex.len() != 64 {
            return Err(invalid(&format!(
                "expected 64 hex characters after the prefix, got {}",
                hex.len()
            )));
        }
        let bytes = hex_to_bytes(hex).map_err(|e| invalid(&e))?;
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self::from_key_bytes(role, &arr))
    }

    /// Parse and require a specific role.
    pub fn parse_role(value: &str, role: KeyRole) -> Result<Self, CoreError> {
        let id = Self::parse(value)?;
        if id.role() != role {
            return Err(CoreError::InvalidIdentity {
                value: value.to_string(),
                reason: format!("expected an {role} key, got an {} key", id.role()),
            });
        }
        Ok(id)
    }

    /// Whether `value` looks like a public identity of any role.
    pub fn is_valid(value: &str) -> bool {
        Self::parse(value).is_ok()
    }

    /// The role encoded in the prefix.
    pub fn role(&self) -> KeyRole {
        // The constructor guarantees a valid prefix.
        self.0
            .chars()
            .next()
            .and_then(KeyRole::from_prefix)
            .unwrap_or(KeyRole::User)
    }

    /// The raw 32-byte public key.
    pub fn key_bytes(&self) -> [u8; 32] {
        let mut arr = [0u8; 32];
        if let Ok(bytes) = hex_to_bytes(&self.0[1..]) {
            arr.copy_from_slice(&bytes);
        }
        arr
    }

    /// The identity as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A short form for log lines: prefix plus the first 8 hex characters.
    pub fn short(&self) -> &str {
        &self.0[..9]
    }
}

impl std::fmt::Display for PublicIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PublicIdentity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for PublicIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PublicIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PublicIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Hex utilities (no external hex crate dependency)
// ---------------------------------------------------------------------------

/// Render bytes as upper-case hex.
pub fn to_hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

/// Decode hex in either case.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("hex string must have even length".to_string());
    }
    if !hex.is_ascii() {
        return Err("hex string must be ASCII".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| format!("invalid hex at position {i}: {e}"))
        })
        .collect()
}
