//! PayOS integrity checks.
//!
//! PayOS signs both its API responses and its webhook notifications with HMAC-SHA256, keyed with the merchant's
//! checksum key. The signed message is not the raw JSON body, but a canonical rendering of the `data` object:
//!
//! * keys are sorted in ascending order,
//! * each entry is rendered as `key=value`,
//! * entries are joined with `&`.
//!
//! `null` values (and the literal strings `"null"` and `"undefined"`) render as an empty string. Arrays and objects are
//! rendered as JSON with their keys sorted. The signature is transmitted as lowercase hex.
//!
//! The same rendering is used when *we* sign a payment request before sending it to PayOS.
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The signature is not valid hex. {0}")]
    InvalidEncoding(String),
    #[error("The signature does not match the signed data.")]
    Mismatch,
}

/// Renders `data` into the canonical `key=value&key=value` form that PayOS signs.
pub fn canonical_data(data: &Map<String, Value>) -> String {
    let mut keys = data.keys().collect::<Vec<_>>();
    keys.sort();
    keys.into_iter().map(|k| format!("{k}={}", canonical_value(&data[k]))).collect::<Vec<String>>().join("&")
}

fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if s == "null" || s == "undefined" => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => sorted(value).to_string(),
    }
}

// serde_json keeps insertion order when `preserve_order` is enabled anywhere in the dependency graph, so objects are
// rebuilt with their keys inserted in sorted order.
fn sorted(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        Value::Object(map) => {
            let mut keys = map.keys().collect::<Vec<_>>();
            keys.sort();
            let map = keys.into_iter().map(|k| (k.clone(), sorted(&map[k]))).collect::<Map<String, Value>>();
            Value::Object(map)
        },
        v => v.clone(),
    }
}

fn new_mac(key: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    HmacSha256::new_from_slice(key.as_bytes()).unwrap_or_else(|_| unreachable!("HMAC can take a key of any size"))
}

/// Calculates the lowercase hex HMAC-SHA256 of `data` using `key`.
pub fn calculate_signature(key: &str, data: &str) -> String {
    let mut mac = new_mac(key);
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `signature` (hex) against the HMAC-SHA256 of `data`. The comparison runs in constant time.
pub fn verify_signature(key: &str, data: &str, signature: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|e| SignatureError::InvalidEncoding(e.to_string()))?;
    let mut mac = new_mac(key);
    mac.update(data.as_bytes());
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}
