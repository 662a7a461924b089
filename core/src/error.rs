//! Error types for the parameter codec, the body codec and the client.
//!
//! # Design
//! Each layer gets its own enum so callers can tell where a failure came
//! from. `ParamError` covers the flat key/value encoding used for path and
//! query parameters, `CodecError` covers request and response bodies, and
//! `ClientError` wraps both plus transport and status failures for callers
//! of `ApiClient`.

use std::fmt::Display;

use thiserror::Error;

use crate::http::TransportError;

/// Failures of the flat parameter encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    /// A required field had no entry, or its entry held no values.
    #[error("missing required parameter `{0}`")]
    MissingField(String),

    /// A present value could not be parsed into the field's declared type.
    #[error("cannot convert parameter `{field}` value {value:?}: {reason}")]
    ConversionFailure {
        field: String,
        value: String,
        reason: String,
    },

    /// The shape is not a flat record of scalars, enums and scalar lists.
    #[error("unsupported parameter shape: {0}")]
    Unsupported(String),

    /// Raised by a type's own `Serialize`/`Deserialize` impl.
    #[error("{0}")]
    Custom(String),
}

impl ParamError {
    pub(crate) fn conversion(field: &str, value: &str, reason: impl Display) -> Self {
        Self::ConversionFailure {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Attach field context to an error raised while handling `field`.
    pub(crate) fn within(self, field: &str, values: &[String]) -> Self {
        match self {
            Self::Custom(reason) => Self::conversion(field, &values.join(","), reason),
            other => other,
        }
    }
}

impl serde::ser::Error for ParamError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

impl serde::de::Error for ParamError {
    fn custom<T: Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        Self::MissingField(field.to_string())
    }
}

/// Failures of the body codec and of content negotiation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode body: {0}")]
    Encode(String),

    #[error("failed to decode body: {0}")]
    Decode(String),

    #[error("unsupported content type `{found}`, expected `{expected}`")]
    UnsupportedContentType { found: String, expected: String },

    #[error("missing content type, expected `{0}`")]
    MissingContentType(String),

    /// The body bytes could not be read off the request.
    #[error("unreadable body: {0}")]
    Unreadable(String),
}

/// Errors returned by `ApiClient`.
///
/// Nothing here is translated: transport and decode failures come back as
/// they were raised.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Path or query arguments could not be encoded.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// The request body could not be encoded or the response body decoded.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The transport failed before a response was received.
    #[error("transport failed: {0}")]
    Transport(#[source] TransportError),
}
