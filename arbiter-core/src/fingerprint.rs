// arbiter-core/src/fingerprint.rs
// ============================================================================
// Module: Canonical Fingerprinting
// Description: RFC 8785 (JCS) JSON canonicalization and SHA-256 fingerprinting.
// Purpose: Provide deterministic, order-independent hashes for payloads, specs,
//          and audit records.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Arbiter fingerprints every piece of content that feeds a decision or an
//! audit record using RFC 8785 JSON Canonicalization Scheme followed by
//! SHA-256. Two JSON values that are semantically equal (same keys and
//! values, any order, any whitespace, any numeric spelling) always produce
//! the same fingerprint.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while computing a canonical fingerprint.
#[derive(Debug, Error)]
pub enum FingerprintError {
    /// JSON canonicalization failed.
    #[error("failed to canonicalize json: {0}")]
    Canonicalization(String),
}

// ============================================================================
// SECTION: Canonicalization
// ============================================================================

/// Returns RFC 8785 canonical JSON bytes for a serializable value.
///
/// # Errors
///
/// Returns [`FingerprintError::Canonicalization`] when serialization fails.
pub fn canonical_json_bytes<T: Serialize + ?Sized>(
    value: &T,
) -> Result<Vec<u8>, FingerprintError> {
    serde_jcs::to_vec(value).map_err(|err| FingerprintError::Canonicalization(err.to_string()))
}

/// Computes the lower-case hex SHA-256 fingerprint of a serializable value's
/// canonical JSON representation.
///
/// # Errors
///
/// Returns [`FingerprintError::Canonicalization`] when serialization fails.
pub fn fingerprint<T: Serialize + ?Sized>(value: &T) -> Result<String, FingerprintError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(hex_sha256(&bytes))
}

/// Computes the lower-case hex SHA-256 digest of raw bytes.
#[must_use]
pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

/// Encodes bytes as a lowercase hex string.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn whitespace_does_not_change_fingerprint() {
        let a: serde_json::Value = serde_json::from_str("{\"a\":1,\"b\":2}").unwrap();
        let b: serde_json::Value = serde_json::from_str("{ \"a\" : 1,  \"b\":2 }").unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn numeric_spelling_does_not_change_fingerprint() {
        let a: serde_json::Value = serde_json::from_str("{\"a\":1.0}").unwrap();
        let b: serde_json::Value = serde_json::from_str("{\"a\":1}").unwrap();
        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn array_order_changes_fingerprint() {
        let a = json!({"a": [1, 2]});
        let b = json!({"a": [2, 1]});
        assert_ne!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn hex_encode_is_lowercase() {
        assert_eq!(hex_encode(&[0xab, 0xCD]), "abcd");
    }
}
