//! # Payload Codec
//!
//! Encoding of values written to the key-value store.
//!
//! ## Format
//! ```text
//!   tally:v1:SGVsbG8gd29ybGQ...
//!   └──┬───┘ └──────┬─────────┘
//!    tag     base64( JSON bytes XOR key )
//!
//!   [ {"id":"1", ...} ]          ← no tag: legacy plain JSON, still readable
//!   tally:v7:....                ← unknown version: UnsupportedVersion
//! ```
//!
//! The XOR step only keeps the payload from being casually readable.
//! It is not encryption.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Prefix shared by every tagged payload.
pub const TAG_PREFIX: &str = "tally:v";

/// Version written by [`encode`].
pub const CURRENT_VERSION: &str = "1";

const OBFUSCATION_KEY: &[u8] = b"tally-pos/kv";

fn xor_in_place(bytes: &mut [u8]) {
    for (i, b) in bytes.iter_mut().enumerate() {
        *b ^= OBFUSCATION_KEY[i % OBFUSCATION_KEY.len()];
    }
}

/// Encodes a value in the current tagged format.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CodecError> {
    let mut bytes = serde_json::to_vec(value)?;
    xor_in_place(&mut bytes);
    Ok(format!(
        "{TAG_PREFIX}{CURRENT_VERSION}:{}",
        STANDARD.encode(bytes)
    ))
}

/// Decodes a stored payload: tagged or legacy plain JSON.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
    let Some(rest) = raw.strip_prefix(TAG_PREFIX) else {
        return Ok(serde_json::from_str(raw)?);
    };

    let (version, body) = rest
        .split_once(':')
        .ok_or_else(|| CodecError::UnsupportedVersion(rest.chars().take(8).collect()))?;

    if version != CURRENT_VERSION {
        return Err(CodecError::UnsupportedVersion(version.to_string()));
    }

    let mut bytes = STANDARD.decode(body.trim())?;
    xor_in_place(&mut bytes);
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_encoded_payload_is_tagged_and_not_plain() {
        let raw = encode(&json!({ "name": "Corner Shop" })).unwrap();
        assert!(raw.starts_with("tally:v1:"));
        assert!(!raw.contains("Corner"));

        let back: Value = decode(&raw).unwrap();
        assert_eq!(back["name"], "Corner Shop");
    }

    #[test]
    fn test_legacy_plain_json_is_readable() {
        let back: Vec<String> = decode(r#"["Drinks","Snacks"]"#).unwrap();
        assert_eq!(back, vec!["Drinks", "Snacks"]);
    }

    #[test]
    fn test_unknown_version_is_rejected() {
        let raw = encode(&json!([1, 2])).unwrap().replacen("v1", "v9", 1);
        let err = decode::<Value>(&raw).unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedVersion(v) if v == "9"));
    }

    #[test]
    fn test_corrupt_envelope_and_body() {
        assert!(matches!(
            decode::<Value>("tally:v1:%%%not-base64%%%"),
            Err(CodecError::Envelope(_))
        ));
        assert!(matches!(decode::<Value>("{ broken"), Err(CodecError::Json(_))));

        // Valid envelope, wrong shape.
        let raw = encode(&json!({ "a": 1 })).unwrap();
        assert!(matches!(decode::<Vec<String>>(&raw), Err(CodecError::Json(_))));
    }
}
