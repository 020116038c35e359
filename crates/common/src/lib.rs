//! caseflow_common
//!
//! Canonical JSON serialization + SHA-256 hashing for the case audit trail.
//! Every audit record hash is computed here, so the byte layout must never
//! depend on field declaration order or formatting.
//!
//! IMPORTANT: Do not "pretty print". Hashes must be computed over canonical bytes.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

/// Prefix carried by every digest string produced by this crate.
pub const DIGEST_PREFIX: &str = "sha256:";

#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to serialize json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Serialize to canonical JSON bytes:
/// - object keys sorted recursively
/// - no whitespace
/// - UTF-8
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let v = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&canonicalize(v))?)
}

/// Return "sha256:<hex>" of canonical JSON bytes.
pub fn sha256_canonical_json<T: Serialize>(value: &T) -> Result<String, CanonError> {
    let bytes = canonical_json_bytes(value)?;
    Ok(sha256_bytes(&bytes))
}

/// Return "sha256:<hex>" of raw bytes.
pub fn sha256_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{DIGEST_PREFIX}{}", hex::encode(digest))
}

/// Digest used as `prev_hash` of the first record in any chain.
pub fn genesis_digest() -> String {
    format!("{DIGEST_PREFIX}{}", "0".repeat(64))
}

/// True when `s` looks like a digest produced by [`sha256_bytes`].
pub fn is_digest(s: &str) -> bool {
    s.strip_prefix(DIGEST_PREFIX)
        .map(|h| h.len() == 64 && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Rebuild every object with its keys in byte order, recursively.
fn canonicalize(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        scalar => scalar,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Ack {
        status: &'static str,
        actor: &'static str,
    }

    #[derive(Serialize)]
    struct AckReordered {
        actor: &'static str,
        status: &'static str,
    }

    #[test]
    fn field_order_does_not_change_digest() {
        let a = Ack { status: "resolved", actor: "employee" };
        let b = AckReordered { actor: "employee", status: "resolved" };
        assert_eq!(sha256_canonical_json(&a).unwrap(), sha256_canonical_json(&b).unwrap());
    }

    #[test]
    fn canonical_bytes_have_no_whitespace() {
        let bytes = canonical_json_bytes(&serde_json::json!({"b": [1, 2], "a": {"d": 1, "c": 2}})).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":{"c":2,"d":1},"b":[1,2]}"#);
    }

    #[test]
    fn genesis_is_a_valid_digest() {
        assert!(is_digest(&genesis_digest()));
        assert!(is_digest(&sha256_bytes(b"case")));
        assert!(!is_digest("sha256:xyz"));
        assert!(!is_digest("md5:00"));
    }
}
