//! Pluggable encode/decode strategy.
//!
//! The bot only needs a way to turn an outgoing value into bytes and an
//! incoming body back into a typed value. `JsonCodec` is the default and the
//! only format the webhook service speaks; custom codecs exist for callers
//! that want a different JSON library or extra validation.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

pub trait Codec: Send + Sync {
    /// Append the encoded form of `value` to `out`.
    fn encode<T: Serialize + ?Sized>(&self, value: &T, out: &mut Vec<u8>) -> Result<(), CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;
}

/// `serde_json` backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T, out: &mut Vec<u8>) -> Result<(), CodecError> {
        serde_json::to_writer(out, value)?;
        Ok(())
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::Envelope;

    #[test]
    fn encode_appends_to_buffer() {
        let mut out = b"prefix:".to_vec();
        JsonCodec.encode(&serde_json::json!({"a": 1}), &mut out).unwrap();
        assert_eq!(out, br#"prefix:{"a":1}"#);
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = JsonCodec.decode::<Envelope>(b"<html>").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }
}
