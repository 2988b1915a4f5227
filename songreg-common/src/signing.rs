//! Payload signing with a shared secret
//!
//! Used for state the browser carries between requests (flash messages).
//!
//! # Algorithm
//!
//! 1. Convert the JSON value to canonical form (sorted keys, no whitespace)
//! 2. Append the secret
//! 3. SHA-256 of the concatenated string
//! 4. Return as 64 lowercase hex characters

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Signature validation error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// Signature does not match calculated value
    Mismatch,
    /// Signature is not 64 hex characters
    Malformed,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::Mismatch => write!(f, "Signature mismatch"),
            SignatureError::Malformed => write!(f, "Malformed signature"),
        }
    }
}

impl std::error::Error for SignatureError {}

/// Calculate the signature of `value` under `secret`
///
/// # Examples
///
/// ```
/// use songreg_common::signing::calculate_signature;
/// use serde_json::json;
///
/// let sig = calculate_signature(&json!({"b": 2, "a": 1}), "secret");
/// assert_eq!(sig.len(), 64);
/// assert_eq!(sig, calculate_signature(&json!({"a": 1, "b": 2}), "secret"));
/// ```
pub fn calculate_signature(value: &Value, secret: &str) -> String {
    let canonical = to_canonical_json(value);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Check `signature` against the value's calculated signature
pub fn verify_signature(signature: &str, value: &Value, secret: &str) -> Result<(), SignatureError> {
    if signature.len() != 64 || !signature.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SignatureError::Malformed);
    }

    let calculated = calculate_signature(value, secret);

    // Compare every byte regardless of where the first difference is
    let diff = calculated
        .bytes()
        .zip(signature.to_ascii_lowercase().bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if diff == 0 {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Convert JSON to canonical form (sorted keys, no whitespace)
///
/// ```
/// use songreg_common::signing::to_canonical_json;
/// use serde_json::json;
///
/// assert_eq!(to_canonical_json(&json!({"z": 3, "a": [1, "x"]})), r#"{"a":[1,"x"],"z":3}"#);
/// ```
pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let items: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), to_canonical_json(v)))
                .collect();
            format!("{{{}}}", items.join(","))
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(to_canonical_json).collect();
            format!("[{}]", items.join(","))
        }
        // serde_json's own escaping for strings and scalars
        other => other.to_string(),
    }
}
