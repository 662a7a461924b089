//! Server binder: turns descriptors into axum routes.
//!
//! # Design
//! Every binding goes through one `register` step. It extracts the raw path
//! parameters, query string, content type and body, then runs parameter
//! decoding, the handler and the result handler inside a single failure
//! boundary (`dispatch`). Decode failures arrive at the result handler as
//! `Err(HandlerError::Params)`, exactly like a failure the handler reported
//! itself. Panics are caught there too and become a 500 unless a response was
//! already committed.

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, RawPathParamsRejection};
use axum::extract::{RawPathParams, RawQuery};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{on, MethodFilter};
use axum::Router;
use futures::FutureExt;
use route_core::{
    is_unit, params, template, BodyCodec, CodecError, Descriptor, HttpMethod, JsonCodec,
    MutationApi, MutationApiWithPath, MutationApiWithQuery, MutationApiWithQueryAndPath,
    MutationDescriptor, ParamShape, ParameterMap, SafeApi, SafeApiWithPath, SafeApiWithQuery,
    SafeApiWithQueryAndPath,
};
use serde::de::DeserializeOwned;

use crate::error::HandlerError;
use crate::responder::Responder;

/// What a handler produces: a value, "nothing here" (`Ok(None)`), or a failure.
pub type Outcome<R> = Result<Option<R>, HandlerError>;

/// The request body of a mutation, typed by the descriptor's body shape.
pub struct Payload<B, C = JsonCodec> {
    body: Result<Bytes, String>,
    content_type: Option<String>,
    codec: C,
    shape: PhantomData<fn() -> B>,
}

impl<B, C: BodyCodec> Payload<B, C> {
    /// Decode the body with the router's codec.
    ///
    /// A non-empty body must be labelled with a content type the codec
    /// accepts. An empty, unlabelled body is handed to the codec as is, which
    /// is how unit bodies arrive.
    pub fn receive(self) -> Result<B, CodecError>
    where
        B: DeserializeOwned + 'static,
    {
        let bytes = self.body.map_err(CodecError::Unreadable)?;
        match self.content_type.as_deref() {
            None if bytes.is_empty() || is_unit::<B>() => self.codec.decode(&bytes),
            None => Err(CodecError::MissingContentType(
                self.codec.content_type().to_string(),
            )),
            Some(found) if !self.codec.accepts(found) => Err(CodecError::UnsupportedContentType {
                found: found.to_string(),
                expected: self.codec.content_type().to_string(),
            }),
            Some(_) => self.codec.decode(&bytes),
        }
    }
}

/// Why the raw path parameters were unavailable.
#[derive(Debug)]
enum PathRejected {
    /// A percent-decoded segment was not UTF-8.
    Malformed(String),
    /// The route matched without capturing any parameters.
    Unrouted(String),
}

impl From<RawPathParamsRejection> for PathRejected {
    fn from(rejection: RawPathParamsRejection) -> Self {
        match rejection {
            RawPathParamsRejection::InvalidUtf8InPathParam(err) => {
                Self::Malformed(err.body_text())
            }
            other => Self::Unrouted(other.body_text()),
        }
    }
}

/// Everything a binding needs from one request.
struct Incoming<C> {
    path: Result<ParameterMap, PathRejected>,
    query: ParameterMap,
    content_type: Option<String>,
    body: Result<Bytes, String>,
    codec: C,
}

impl<C: BodyCodec> Incoming<C> {
    fn path<P: DeserializeOwned>(&self) -> Result<P, HandlerError> {
        match &self.path {
            Ok(map) => Ok(params::decode(map)?),
            Err(PathRejected::Malformed(reason)) => {
                Err(HandlerError::invalid_argument(reason.clone()))
            }
            Err(PathRejected::Unrouted(reason)) => {
                Err(HandlerError::Unclassified(anyhow::anyhow!("{reason}")))
            }
        }
    }

    fn query<Q: DeserializeOwned>(&self) -> Result<Q, HandlerError> {
        Ok(params::decode(&self.query)?)
    }

    /// The body, typed by the descriptor's body shape.
    fn payload<D: MutationDescriptor>(self) -> Payload<D::Body, C> {
        Payload {
            body: self.body,
            content_type: self.content_type,
            codec: self.codec,
            shape: PhantomData,
        }
    }
}

struct Binding<W, H> {
    work: W,
    on_result: H,
}

/// Route table built from descriptors.
///
/// Each binding method takes the descriptor, a result handler (usually
/// [`respond_default`](crate::responder::respond_default)) and the handler.
pub struct ApiRouter<S = (), C = JsonCodec> {
    router: Router<S>,
    codec: C,
}

impl ApiRouter<(), JsonCodec> {
    pub fn new() -> Self {
        Self::with_codec(JsonCodec)
    }
}

impl Default for ApiRouter<(), JsonCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: BodyCodec> ApiRouter<(), C> {
    pub fn with_codec(codec: C) -> Self {
        Self::from_router(Router::new(), codec)
    }
}

impl<S, C> ApiRouter<S, C>
where
    S: Clone + Send + Sync + 'static,
    C: BodyCodec,
{
    /// Add bindings to an existing router, e.g. one that needs state `S`.
    pub fn from_router(router: Router<S>, codec: C) -> Self {
        Self { router, codec }
    }

    pub fn into_router(self) -> Router<S> {
        self.router
    }

    pub fn safe<R, F, Fut, H>(self, api: &SafeApi<R>, on_result: H, handler: F) -> Self
    where
        R: Send + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |_: Incoming<C>| handler())
    }

    pub fn safe_with_query<R, Q, F, Fut, H>(
        self,
        api: &SafeApiWithQuery<R, Q>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        Q: DeserializeOwned,
        F: Fn(Q) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            settle(incoming.query::<Q>().map(&handler))
        })
    }

    pub fn safe_with_path<R, P, F, Fut, H>(
        self,
        api: &SafeApiWithPath<R, P>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        P: DeserializeOwned,
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            settle(incoming.path::<P>().map(&handler))
        })
    }

    pub fn safe_with_query_and_path<R, Q, P, F, Fut, H>(
        self,
        api: &SafeApiWithQueryAndPath<R, Q, P>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        Q: DeserializeOwned,
        P: DeserializeOwned,
        F: Fn(Q, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            let call = incoming
                .query::<Q>()
                .and_then(|query| Ok(handler(query, incoming.path::<P>()?)));
            settle(call)
        })
    }

    pub fn mutation<R, B, F, Fut, H>(
        self,
        api: &MutationApi<R, B>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        F: Fn(Payload<B, C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            handler(incoming.payload::<MutationApi<R, B>>())
        })
    }

    pub fn mutation_with_query<R, B, Q, F, Fut, H>(
        self,
        api: &MutationApiWithQuery<R, B, Q>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        Q: DeserializeOwned,
        F: Fn(Q, Payload<B, C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            let call = incoming.query::<Q>().map(|query| {
                let payload = incoming.payload::<MutationApiWithQuery<R, B, Q>>();
                handler(query, payload)
            });
            settle(call)
        })
    }

    pub fn mutation_with_path<R, B, P, F, Fut, H>(
        self,
        api: &MutationApiWithPath<R, B, P>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        P: DeserializeOwned,
        F: Fn(P, Payload<B, C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            let call = incoming.path::<P>().map(|path| {
                let payload = incoming.payload::<MutationApiWithPath<R, B, P>>();
                handler(path, payload)
            });
            settle(call)
        })
    }

    pub fn mutation_with_query_and_path<R, B, Q, P, F, Fut, H>(
        self,
        api: &MutationApiWithQueryAndPath<R, B, Q, P>,
        on_result: H,
        handler: F,
    ) -> Self
    where
        R: Send + 'static,
        Q: DeserializeOwned,
        P: DeserializeOwned,
        F: Fn(Q, P, Payload<B, C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<R>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<R>) + Send + Sync + 'static,
    {
        self.register(api, on_result, move |incoming: Incoming<C>| {
            let call = incoming.query::<Q>().and_then(|query| {
                let path = incoming.path::<P>()?;
                let payload = incoming.payload::<MutationApiWithQueryAndPath<R, B, Q, P>>();
                Ok(handler(query, path, payload))
            });
            settle(call)
        })
    }

    fn register<D, W, WFut, H>(self, api: &D, on_result: H, work: W) -> Self
    where
        D: Descriptor,
        D::Response: Send + 'static,
        W: Fn(Incoming<C>) -> WFut + Send + Sync + 'static,
        WFut: Future<Output = Outcome<D::Response>> + Send + 'static,
        H: Fn(&Responder<C>, Outcome<D::Response>) + Send + Sync + 'static,
    {
        let method = api.http_method();
        let shape = api.shape();
        let placeholders = template::placeholders(api.url());
        tracing::debug!(
            %method,
            url = api.url(),
            ?shape,
            ?placeholders,
            query = shape.has_query(),
            "binding route"
        );
        if let Some(problem) = template_mismatch(shape, &placeholders) {
            tracing::warn!(
                url = api.url(),
                ?shape,
                problem,
                "descriptor does not fit its template"
            );
        }

        let binding = Arc::new(Binding { work, on_result });
        let codec = self.codec.clone();
        let route = move |path: Result<RawPathParams, RawPathParamsRejection>,
                          RawQuery(query): RawQuery,
                          headers: HeaderMap,
                          body: Result<Bytes, BytesRejection>| {
            let incoming = Incoming {
                path: path
                    .map(|raw| raw.iter().collect())
                    .map_err(PathRejected::from),
                query: ParameterMap::from_query(query.as_deref().unwrap_or_default()),
                content_type: headers
                    .get(header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_owned),
                body: body.map_err(|rejection| rejection.body_text()),
                codec: codec.clone(),
            };
            dispatch(Arc::clone(&binding), incoming)
        };

        Self {
            router: self.router.route(api.url(), on(method_filter(method), route)),
            codec: self.codec,
        }
    }
}

/// Why a template cannot serve a descriptor of `shape`, if it cannot.
fn template_mismatch(shape: ParamShape, placeholders: &[&str]) -> Option<&'static str> {
    match (shape.has_path(), placeholders.is_empty()) {
        (true, true) => Some("path parameters declared but the template has no placeholders"),
        (false, false) => Some("template has placeholders but no path parameters are declared"),
        _ => None,
    }
}

/// Await the handler's future, or pass a decode failure straight through.
async fn settle<R, Fut>(call: Result<Fut, HandlerError>) -> Outcome<R>
where
    Fut: Future<Output = Outcome<R>>,
{
    match call {
        Ok(future) => future.await,
        Err(error) => Err(error),
    }
}

async fn dispatch<C, R, W, WFut, H>(binding: Arc<Binding<W, H>>, incoming: Incoming<C>) -> Response
where
    C: BodyCodec,
    W: Fn(Incoming<C>) -> WFut,
    WFut: Future<Output = Outcome<R>>,
    H: Fn(&Responder<C>, Outcome<R>),
{
    let responder = Responder::new(incoming.codec.clone());
    let run = AssertUnwindSafe(async {
        let outcome = (binding.work)(incoming).await;
        if let Err(error) = &outcome {
            tracing::warn!(status = %error.status(), error = %error, "request failed");
        }
        (binding.on_result)(&responder, outcome);
    });

    if let Err(panic) = run.catch_unwind().await {
        let message = panic_message(panic.as_ref());
        tracing::error!(panic = %message, "handler panicked");
        if !responder.is_committed() {
            if let Err(err) = responder.text(StatusCode::INTERNAL_SERVER_ERROR, message) {
                tracing::error!(error = %err, "failed to commit fallback response");
            }
        }
    }

    match responder.into_response() {
        Some(response) => response,
        None => {
            tracing::warn!("result handler committed no response");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Options => MethodFilter::OPTIONS,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Patch => MethodFilter::PATCH,
        HttpMethod::Delete => MethodFilter::DELETE,
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Named {
        name: String,
    }

    fn payload<B>(body: &'static [u8], content_type: Option<&str>) -> Payload<B> {
        Payload {
            body: Ok(Bytes::from_static(body)),
            content_type: content_type.map(str::to_owned),
            codec: JsonCodec,
            shape: PhantomData,
        }
    }

    #[test]
    fn payload_decodes_labelled_body() {
        let named: Named = payload(br#"{"name":"x"}"#, Some("application/json; charset=utf-8"))
            .receive()
            .unwrap();
        assert_eq!(named.name, "x");
    }

    #[test]
    fn payload_requires_content_type_for_non_empty_body() {
        let err = payload::<Named>(br#"{"name":"x"}"#, None).receive().unwrap_err();
        assert!(matches!(err, CodecError::MissingContentType(_)));
    }

    #[test]
    fn payload_rejects_foreign_content_type() {
        let err = payload::<Named>(b"name=x", Some("application/x-www-form-urlencoded"))
            .receive()
            .unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedContentType { .. }));
    }

    #[test]
    fn payload_accepts_empty_unit_body() {
        payload::<()>(b"", None).receive().unwrap();
    }

    fn incoming(path: Result<ParameterMap, PathRejected>) -> Incoming<JsonCodec> {
        Incoming {
            path,
            query: ParameterMap::new(),
            content_type: None,
            body: Ok(Bytes::new()),
            codec: JsonCodec,
        }
    }

    #[test]
    fn malformed_path_is_a_client_error() {
        let rejected = PathRejected::Malformed("Invalid UTF-8 in `name`".to_string());
        let err = incoming(Err(rejected)).path::<Named>().unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unrouted_path_is_a_server_error() {
        let rejected = PathRejected::Unrouted("No paths parameters found".to_string());
        let err = incoming(Err(rejected)).path::<Named>().unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "No paths parameters found");
    }

    #[test]
    fn captured_path_decodes() {
        let map: ParameterMap = [("name", "ada")].into_iter().collect();
        let named = incoming(Ok(map)).path::<Named>().unwrap();
        assert_eq!(named.name, "ada");
    }

    #[test]
    fn templates_must_fit_the_shape() {
        assert!(template_mismatch(ParamShape::Path, &[]).is_some());
        assert!(template_mismatch(ParamShape::Query, &["id"]).is_some());
        assert!(template_mismatch(ParamShape::QueryAndPath, &["id"]).is_none());
        assert!(template_mismatch(ParamShape::Plain, &[]).is_none());
    }

    #[test]
    fn panic_messages_are_recovered() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(boxed.as_ref()), "static message");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(boxed.as_ref()), "owned message");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "handler panicked");
    }
}
