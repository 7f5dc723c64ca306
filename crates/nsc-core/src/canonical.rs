//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes that get signed
//! or digested. A claim serialized twice with the same content must produce
//! the same bytes, otherwise a re-read token would fail verification.
//!
//! ## Rules
//!
//! 1. **Reject floats.** Limits and durations are integers. A float in a
//!    claim body is a bug upstream.
//! 2. **Sorted keys, compact separators.** Output is RFC 8785 (JCS) via
//!    `serde_jcs`.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructors are [`CanonicalBytes::new()`] and
///   [`CanonicalBytes::from_value()`].
/// - No float numbers appear anywhere in the encoded value.
/// - Object keys are sorted; separators are compact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::FloatRejected` if the value contains a
    /// float, or `SerializationFailed` if serde fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Self::from_value(value)
    }

    /// Canonicalize an already-built JSON value.
    ///
    /// Used when a field has to be stripped before signing (the signing input
    /// of a claim excludes its own `jti`).
    pub fn from_value(value: Value) -> Result<Self, CanonicalizationError> {
        reject_floats(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn reject_floats(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if n.is_f64() && !n.is_i64() && !n.is_u64() {
                if let Some(f) = n.as_f64() {
                    return Err(CanonicalizationError::FloatRejected(f));
                }
            }
            Ok(())
        }
        Value::Object(map) => map.values().try_for_each(reject_floats),
        Value::Array(arr) => arr.iter().try_for_each(reject_floats),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_sorted_and_compact() {
        let data = serde_json::json!({"sub": "U1", "iss": "A1", "nats": {"b": 2, "a": 1}});
        let cb = CanonicalBytes::new(&data).unwrap();
        let s = std::str::from_utf8(cb.as_bytes()).unwrap();
        assert_eq!(s, r#"{"iss":"A1","nats":{"a":1,"b":2},"sub":"U1"}"#);
    }

    #[test]
    fn same_content_same_bytes() {
        let a = serde_json::json!({"x": [1, 2], "y": "z"});
        let b = serde_json::json!({"y": "z", "x": [1, 2]});
        assert_eq!(CanonicalBytes::new(&a).unwrap(), CanonicalBytes::new(&b).unwrap());
    }

    #[test]
    fn nested_float_rejected() {
        let data = serde_json::json!({"limits": {"payload": 1.5}});
        match CanonicalBytes::new(&data) {
            Err(CanonicalizationError::FloatRejected(f)) => assert_eq!(f, 1.5),
            other => panic!("expected FloatRejected, got {other:?}"),
        }
    }

    #[test]
    fn negative_integers_pass() {
        let data = serde_json::json!({"subs": -1});
        assert!(CanonicalBytes::new(&data).is_ok());
    }

    #[test]
    fn from_value_matches_new() {
        let data = serde_json::json!({"a": true});
        let via_new = CanonicalBytes::new(&data).unwrap();
        let via_value = CanonicalBytes::from_value(data).unwrap();
        assert_eq!(via_new, via_value);
        assert!(!via_new.is_empty());
        assert_eq!(via_new.len(), via_new.as_ref().len());
    }
}
