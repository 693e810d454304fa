//! Application-facing value model.
//!
//! [`Value`] is a closed set of variants. Raw bytes bypass serialization
//! entirely; everything else is carried as MessagePack by [`crate::codec`].
//! [`Entry`] is the decoded view of a stored record.

use crate::error::{Error, Result};
use crate::expiry::Timestamp;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;

/// A value that can be stored under a key.
///
/// Build structured values through [`Value::structured`] or
/// [`Value::from_serializable`]: both normalise scalar JSON (strings,
/// numbers, booleans) into the scalar variants, which is also what decoding
/// produces. A hand-built `Value::Structured(json!("x"))` reads back as
/// `Value::Text("x")`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Opaque bytes, stored and returned byte-for-byte.
    Raw(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Arrays, maps, null, and integers outside the `i64` range.
    Structured(serde_json::Value),
}

impl Value {
    /// Builds a value from JSON, mapping scalars onto their dedicated variants.
    pub fn structured(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else if n.is_f64()
                    && let Some(f) = n.as_f64()
                {
                    Self::Float(f)
                } else {
                    Self::Structured(serde_json::Value::Number(n))
                }
            },
            other => Self::Structured(other),
        }
    }

    /// Serializes any serde type into a value.
    ///
    /// Fails with [`Error::Encoding`] when the type has no JSON form
    /// (for example maps with non-string keys).
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::structured)
            .map_err(|e| Error::Encoding(format!("value is not representable: {e}")))
    }

    /// Deserializes this value into any serde type.
    ///
    /// Raw values are rejected: their bytes carry no schema.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T> {
        let json = match self {
            Self::Raw(_) => {
                return Err(Error::Decoding(
                    "raw bytes cannot be deserialized into a structured type".to_string(),
                ));
            },
            other => other.to_json(),
        };
        serde_json::from_value(json)
            .map_err(|e| Error::Decoding(format!("structured value does not match type: {e}")))
    }

    /// Short name of the variant, used in error messages and CLI output.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Raw(_) => "raw",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Structured(_) => "structured",
        }
    }

    /// Returns true for [`Value::Raw`].
    pub const fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }

    /// JSON view of a non-raw value. Raw bytes become an array of numbers.
    pub(crate) fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Raw(bytes) => serde_json::Value::from(bytes.clone()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Value::from(*f),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Structured(json) => json.clone(),
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::Decoding(format!(
            "expected {expected}, stored value is {}",
            self.type_name()
        ))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(bytes) => {
                f.write_str("0x")?;
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            },
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Structured(json) => write!(f, "{json}"),
        }
    }
}

// =============================================================================
// Conversions into Value
// =============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Raw(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Raw(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Raw(bytes.to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Self::structured(json)
    }
}

// =============================================================================
// Typed extraction
// =============================================================================

impl TryFrom<Value> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Raw(bytes) => Ok(bytes),
            other => Err(other.mismatch("raw bytes")),
        }
    }
}

impl TryFrom<Value> for String {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(other.mismatch("text")),
        }
    }
}

impl TryFrom<Value> for i64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(other.mismatch("integer")),
        }
    }
}

impl TryFrom<Value> for f64 {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            #[allow(clippy::cast_precision_loss)]
            Value::Integer(i) => Ok(i as f64),
            other => Err(other.mismatch("float")),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(other.mismatch("boolean")),
        }
    }
}

impl TryFrom<Value> for serde_json::Value {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Raw(_) => Err(value.mismatch("structured data")),
            other => Ok(other.to_json()),
        }
    }
}

// =============================================================================
// Entry
// =============================================================================

/// Decoded view of a stored record.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Primary identity. Never empty.
    pub key: String,
    /// Decoded value.
    pub value: Value,
    /// Expiration as Unix seconds. `None` means the entry never expires.
    pub expires_at: Option<Timestamp>,
}

impl Entry {
    /// Creates an entry that never expires.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            expires_at: None,
        }
    }

    /// Sets an absolute expiration (Unix seconds).
    #[must_use]
    pub const fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Extracts the value as a concrete type.
    ///
    /// Fails with [`Error::Decoding`] when the stored variant does not match,
    /// e.g. asking for `Vec<u8>` when a text value was stored.
    pub fn value_as<T>(&self) -> Result<T>
    where
        T: TryFrom<Value, Error = Error>,
    {
        T::try_from(self.value.clone())
    }

    /// Consumes the entry, returning its value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Profile {
        name: String,
        age: u32,
    }

    #[test]
    fn test_structured_normalises_scalars() {
        assert_eq!(Value::structured(json!("hi")), Value::Text("hi".into()));
        assert_eq!(Value::structured(json!(7)), Value::Integer(7));
        assert_eq!(Value::structured(json!(1.5)), Value::Float(1.5));
        assert_eq!(Value::structured(json!(true)), Value::Boolean(true));
        assert_eq!(
            Value::structured(json!([1, 2])),
            Value::Structured(json!([1, 2]))
        );
        assert_eq!(Value::structured(json!(null)), Value::Structured(json!(null)));
    }

    #[test]
    fn test_large_unsigned_stays_structured() {
        let v = Value::structured(json!(u64::MAX));
        assert!(matches!(v, Value::Structured(_)));
    }

    #[test]
    fn test_serde_bridge() {
        let profile = Profile {
            name: "ada".into(),
            age: 36,
        };
        let value = Value::from_serializable(&profile).unwrap();
        assert!(matches!(value, Value::Structured(_)));
        let back: Profile = value.deserialize_into().unwrap();
        assert_eq!(back, profile);
    }

    #[test]
    fn test_non_string_map_keys_fail_to_encode() {
        let mut map = std::collections::HashMap::new();
        map.insert(vec![1u8], 1);
        let err = Value::from_serializable(&map).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_raw_cannot_deserialize() {
        let err = Value::Raw(vec![1, 2]).deserialize_into::<Vec<u8>>().unwrap_err();
        assert!(matches!(err, Error::Decoding(_)));
    }

    #[test]
    fn test_typed_extraction_mismatch() {
        let entry = Entry::new("k", "text");
        assert_eq!(entry.value_as::<String>().unwrap(), "text");
        assert!(matches!(
            entry.value_as::<Vec<u8>>(),
            Err(Error::Decoding(_))
        ));
        assert!(matches!(entry.value_as::<i64>(), Err(Error::Decoding(_))));
    }

    #[test]
    fn test_raw_extraction() {
        let entry = Entry::new("k", b"\x00\xff");
        assert_eq!(entry.value_as::<Vec<u8>>().unwrap(), vec![0x00, 0xff]);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Raw(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(Value::Integer(-3).to_string(), "-3");
        assert_eq!(Value::Structured(json!({"a": 1})).to_string(), r#"{"a":1}"#);
    }
}
