//! Commit-once response slot and the default result handler.
//!
//! # Design
//! A result handler writes its answer into a `Responder` instead of returning
//! it. The binder can then tell whether a response was already committed when
//! something panics later, and never produces a second one.

use std::sync::{Mutex, PoisonError};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use route_core::{is_unit, BodyCodec, CodecError, JsonCodec};
use serde::Serialize;
use thiserror::Error;

use crate::binder::Outcome;
use crate::error::translate;

#[derive(Debug, Error)]
pub enum RespondError {
    #[error("a response was already committed for this request")]
    AlreadyCommitted,

    #[error(transparent)]
    Encode(#[from] CodecError),
}

/// Holds at most one response per request.
pub struct Responder<C = JsonCodec> {
    codec: C,
    slot: Mutex<Option<Response>>,
}

impl<C: BodyCodec> Responder<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            slot: Mutex::new(None),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Commit `response`; fails if one was already committed.
    pub fn commit(&self, response: Response) -> Result<(), RespondError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(RespondError::AlreadyCommitted);
        }
        *slot = Some(response);
        Ok(())
    }

    /// Commit `status` with an empty body.
    pub fn status(&self, status: StatusCode) -> Result<(), RespondError> {
        self.commit(status.into_response())
    }

    /// Commit `status` with a plain-text body.
    pub fn text(&self, status: StatusCode, message: impl Into<String>) -> Result<(), RespondError> {
        self.commit((status, message.into()).into_response())
    }

    /// Commit `status` with `value` encoded by the codec.
    pub fn value<T: Serialize + ?Sized>(
        &self,
        status: StatusCode,
        value: &T,
    ) -> Result<(), RespondError> {
        let bytes = self.codec.encode(value)?;
        let content_type = HeaderValue::from_static(self.codec.content_type());
        self.commit((status, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
    }

    pub(crate) fn into_response(self) -> Option<Response> {
        self.slot
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Default result handling:
/// - `Ok(None)` is 404 with no body
/// - `Ok(Some(()))` is 200 with no body
/// - `Ok(Some(value))` is 200 with `value` encoded by the codec
/// - `Err(error)` is translated by [`translate`] and logged
pub fn respond_default<R, C>(responder: &Responder<C>, outcome: Outcome<R>)
where
    R: Serialize + 'static,
    C: BodyCodec,
{
    let committed = match outcome {
        Ok(None) => responder.status(StatusCode::NOT_FOUND),
        Ok(Some(_)) if is_unit::<R>() => responder.status(StatusCode::OK),
        Ok(Some(value)) => match responder.value(StatusCode::OK, &value) {
            Err(RespondError::Encode(err)) => {
                tracing::error!(error = %err, "failed to encode response");
                responder.text(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            other => other,
        },
        Err(error) => {
            let (status, message) = translate(&error);
            tracing::error!(%status, error = %error, "handler failed");
            responder.text(status, message)
        }
    };
    if let Err(err) = committed {
        tracing::error!(error = %err, "failed to commit response");
    }
}
