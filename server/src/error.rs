//! Handler failures and their translation to HTTP statuses.

use axum::http::StatusCode;
use route_core::{CodecError, ParamError};
use thiserror::Error;

/// Why a bound handler did not produce a value.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Path or query parameters could not be decoded.
    #[error(transparent)]
    Params(#[from] ParamError),

    /// The request body could not be decoded, or had the wrong content type.
    #[error(transparent)]
    ContentDecode(#[from] CodecError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    InvalidState(String),

    /// Any other failure.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl HandlerError {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    #[must_use]
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unclassified(anyhow::Error::new(error))
    }

    /// Status for this failure.
    ///
    /// A parameter shape the codec cannot handle at all is a server-side
    /// contract bug, so only missing and unparsable values are client errors.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Params(ParamError::MissingField(_) | ParamError::ConversionFailure { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Params(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ContentDecode(_) => StatusCode::BAD_REQUEST,
            Self::InvalidArgument(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Status and plain-text body for `error`.
pub fn translate(error: &HandlerError) -> (StatusCode, String) {
    (error.status(), error.to_string())
}
