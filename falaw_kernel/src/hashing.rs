//! FaLaw Kernel: Canonical Hashing
//!
//! Deterministic canonical serialization + SHA-256 hashing.
//!
//! Rules:
//!   - kernel_version first, then fields in fixed order
//!   - matrix as 8 rows in element index order
//!   - every float rendered as a fixed 9-decimal string
//!   - UTF-8 JSON, no whitespace

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::element::Element;
use crate::events::RegimeLog;
use crate::matrix::TransferMatrix;
use crate::KERNEL_VERSION;

/// Fixed-precision rendering used for every float that enters a hash.
pub fn canonical_float(v: f64) -> Value {
    Value::String(format!("{:.9}", v))
}

/// Replace every non-integer number in `value` with its canonical string.
pub fn canonicalize(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => canonical_float(n.as_f64().unwrap_or(0.0)),
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Any serializable value, canonicalized.
pub fn canonical_value<T: Serialize>(item: &T) -> Value {
    let value = serde_json::to_value(item).expect("canonical_value: JSON serialization failed");
    canonicalize(value)
}

/// Lowercase hex SHA-256.
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<String>()
}

pub fn to_bytes(value: &Value) -> Vec<u8> {
    serde_json::to_string(value)
        .expect("canonical_serialize: JSON serialization failed")
        .into_bytes()
}

fn matrix_value(matrix: &TransferMatrix) -> Value {
    let rows = Element::ALL
        .iter()
        .map(|e| Value::Array(matrix.row(*e).iter().map(|v| canonical_float(*v)).collect()))
        .collect();
    Value::Array(rows)
}

/// Canonical bytes of the matrix alone.
pub fn canonical_serialize_matrix(matrix: &TransferMatrix) -> Vec<u8> {
    let mut root = Map::new();
    root.insert(
        "kernel_version".to_string(),
        Value::Number((KERNEL_VERSION as i64).into()),
    );
    root.insert("matrix".to_string(), matrix_value(matrix));
    to_bytes(&Value::Object(root))
}

pub fn matrix_hash(matrix: &TransferMatrix) -> String {
    sha256_hex(&canonical_serialize_matrix(matrix))
}

/// Canonical bytes of matrix plus regime history.
pub fn canonical_serialize(matrix: &TransferMatrix, log: &RegimeLog) -> Vec<u8> {
    let mut root = Map::new();
    root.insert(
        "kernel_version".to_string(),
        Value::Number((KERNEL_VERSION as i64).into()),
    );
    root.insert("matrix".to_string(), matrix_value(matrix));
    root.insert(
        "regime_events".to_string(),
        Value::Array(log.events().iter().map(canonical_value).collect()),
    );
    to_bytes(&Value::Object(root))
}

pub fn canonical_hash(matrix: &TransferMatrix, log: &RegimeLog) -> String {
    sha256_hex(&canonical_serialize(matrix, log))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatrixSeed;

    #[test]
    fn test_matrix_hash_is_stable() {
        let a = TransferMatrix::build(&MatrixSeed::default()).unwrap();
        let b = TransferMatrix::build(&MatrixSeed::default()).unwrap();
        assert_eq!(matrix_hash(&a), matrix_hash(&b));
        assert_eq!(matrix_hash(&a).len(), 64);
    }

    #[test]
    fn test_matrix_hash_tracks_mutation() {
        let a = TransferMatrix::build(&MatrixSeed::default()).unwrap();
        let mut b = a.clone();
        b.set(Element::Qian, Element::She, 0.2).unwrap();
        assert_ne!(matrix_hash(&a), matrix_hash(&b));
    }

    #[test]
    fn test_kernel_version_first() {
        let a = TransferMatrix::build(&MatrixSeed::default()).unwrap();
        let text = String::from_utf8(canonical_serialize(&a, &RegimeLog::default())).unwrap();
        assert!(text.starts_with("{\"kernel_version\":1,"));
        assert!(text.ends_with("\"regime_events\":[]}"));
    }

    #[test]
    fn test_canonicalize_floats() {
        let v = canonicalize(serde_json::json!({"a": 0.1, "b": [2, 0.5], "c": "x"}));
        assert_eq!(
            v,
            serde_json::json!({"a": "0.100000000", "b": [2, "0.500000000"], "c": "x"})
        );
    }
}
