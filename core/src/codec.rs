//! Body codec capability.
//!
//! Request and response bodies go through a `BodyCodec`; path and query
//! parameters never do (see `params`).

use std::any::TypeId;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CodecError;

/// Encodes and decodes request/response bodies for one content type.
pub trait BodyCodec: Clone + Send + Sync + 'static {
    fn content_type(&self) -> &'static str;

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError>;

    /// Whether a `Content-Type` header value names this codec's media type.
    /// Parameters such as `charset` are ignored.
    fn accepts(&self, content_type: &str) -> bool {
        content_type
            .split(';')
            .next()
            .map(str::trim)
            .is_some_and(|media| media.eq_ignore_ascii_case(self.content_type()))
    }
}

/// JSON bodies via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl BodyCodec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    /// An empty body decodes as JSON `null`, so `()` and `Option<_>` accept it.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let result = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(serde_json::Value::Null)
        } else {
            serde_json::from_slice(bytes)
        };
        result.map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// True when `T` is the unit type, which is never sent as a body.
pub fn is_unit<T: ?Sized + 'static>() -> bool {
    TypeId::of::<T>() == TypeId::of::<()>()
}
