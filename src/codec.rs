//! Value codec: [`Value`] to and from the stored blob.
//!
//! Blob layout is one marker byte followed by the payload:
//!
//! | Marker | Payload                                         |
//! |--------|-------------------------------------------------|
//! | `0x01` | raw bytes, copied verbatim                      |
//! | `0x02` | MessagePack of a string, number, bool or tree   |
//!
//! Any other marker is a format error. New payload schemes get new markers;
//! existing markers keep their meaning.

use crate::constants::{MARKER_RAW, MARKER_STRUCTURED};
use crate::error::{Error, Result};
use crate::value::Value;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// MessagePack markers for `float 32` / `float 64`.
const MSGPACK_FLOAT32: u8 = 0xca;
const MSGPACK_FLOAT64: u8 = 0xcb;

/// Encodes a value into a marker-prefixed blob.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let payload = match value {
        Value::Raw(bytes) => {
            let mut out = Vec::with_capacity(bytes.len() + 1);
            out.push(MARKER_RAW);
            out.extend_from_slice(bytes);
            return Ok(out);
        },
        Value::Text(s) => rmp_serde::to_vec(s),
        Value::Integer(i) => rmp_serde::to_vec(i),
        Value::Float(f) => rmp_serde::to_vec(f),
        Value::Boolean(b) => rmp_serde::to_vec(b),
        Value::Structured(json) => rmp_serde::to_vec(json),
    }
    .map_err(|e| Error::Encoding(format!("failed to serialize {}: {e}", value.type_name())))?;

    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(MARKER_STRUCTURED);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes a blob produced by [`encode`].
pub fn decode(buffer: &[u8]) -> Result<Value> {
    let Some((&marker, payload)) = buffer.split_first() else {
        return Err(Error::Decoding("empty buffer has no marker byte".to_string()));
    };

    match marker {
        MARKER_RAW => Ok(Value::Raw(payload.to_vec())),
        MARKER_STRUCTURED => decode_structured(payload),
        other => Err(Error::Decoding(format!("unknown data marker 0x{other:02x}"))),
    }
}

/// Decodes a blob and extracts a concrete type.
///
/// Raw payloads only satisfy `Vec<u8>`; asking for any other type is a
/// [`Error::Decoding`] mismatch, as is asking for bytes from a structured payload.
pub fn decode_as<T>(buffer: &[u8]) -> Result<T>
where
    T: TryFrom<Value, Error = Error>,
{
    T::try_from(decode(buffer)?)
}

fn decode_structured(payload: &[u8]) -> Result<Value> {
    // JSON numbers cannot hold NaN or infinities, so floats skip the JSON tree
    if matches!(payload.first(), Some(&(MSGPACK_FLOAT32 | MSGPACK_FLOAT64))) {
        return from_msgpack::<f64>(payload)
            .map(Value::Float)
            .map_err(|e| Error::Decoding(format!("malformed float payload: {e}")));
    }

    from_msgpack::<serde_json::Value>(payload)
        .map(Value::structured)
        .map_err(|e| Error::Decoding(format!("malformed structured payload: {e}")))
}

/// Reads exactly one MessagePack value; leftover bytes are an error.
fn from_msgpack<T: DeserializeOwned>(payload: &[u8]) -> std::result::Result<T, String> {
    let mut rest = payload;
    let value = {
        let mut de = rmp_serde::Deserializer::new(&mut rest);
        T::deserialize(&mut de).map_err(|e| e.to_string())?
    };

    if !rest.is_empty() {
        return Err(format!("{} trailing bytes after value", rest.len()));
    }
    Ok(value)
}
