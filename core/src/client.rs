//! Descriptor-driven HTTP request builder and response parser.
//!
//! # Design
//! `ApiClient` holds a `base_url`, a `Transport` and a `BodyCodec`, and keeps
//! no state between calls. Every call is split into `build` (descriptor plus
//! arguments to `HttpRequest`) and `parse` (`HttpResponse` to the descriptor's
//! response shape); `invoke` runs both around one `Transport::execute`.
//!
//! The arguments a call takes follow from the descriptor type through
//! `Invocation::Args`:
//!
//! | descriptor                          | args        |
//! |-------------------------------------|-------------|
//! | `SafeApi`                           | `()`        |
//! | `SafeApiWithQuery`                  | `Q`         |
//! | `SafeApiWithPath`                   | `P`         |
//! | `SafeApiWithQueryAndPath`           | `(Q, P)`    |
//! | `MutationApi`                       | `B`         |
//! | `MutationApiWithQuery`              | `(Q, B)`    |
//! | `MutationApiWithPath`               | `(P, B)`    |
//! | `MutationApiWithQueryAndPath`       | `(Q, P, B)` |
//!
//! A `()` body is never sent.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{is_unit, BodyCodec, JsonCodec};
use crate::descriptor::{
    Descriptor, MutationApi, MutationApiWithPath, MutationApiWithQuery,
    MutationApiWithQueryAndPath, SafeApi, SafeApiWithPath, SafeApiWithQuery,
    SafeApiWithQueryAndPath,
};
use crate::error::ClientError;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::params::{self, ParameterMap};
use crate::template;

/// The per-call pieces a descriptor contributes to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallParts {
    /// URL template with path placeholders already substituted.
    pub path: String,
    pub query: ParameterMap,
    pub body: Option<Vec<u8>>,
}

/// Implemented once per descriptor type: turns call arguments into
/// `CallParts`.
pub trait Invocation: Descriptor {
    type Args;

    fn call_parts<C: BodyCodec>(&self, args: Self::Args, codec: &C)
        -> Result<CallParts, ClientError>;
}

fn query_parts<Q: Serialize>(query: &Q) -> Result<ParameterMap, ClientError> {
    Ok(params::encode(query)?)
}

fn path_parts<P: Serialize>(template: &str, path: &P) -> Result<String, ClientError> {
    Ok(template::resolve(template, path)?)
}

fn body_parts<B: Serialize + 'static, C: BodyCodec>(
    body: &B,
    codec: &C,
) -> Result<Option<Vec<u8>>, ClientError> {
    if is_unit::<B>() {
        return Ok(None);
    }
    Ok(Some(codec.encode(body)?))
}

impl<R> Invocation for SafeApi<R> {
    type Args = ();

    fn call_parts<C: BodyCodec>(&self, _args: (), _codec: &C) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: self.url().to_string(),
            ..CallParts::default()
        })
    }
}

impl<R, Q: Serialize> Invocation for SafeApiWithQuery<R, Q> {
    type Args = Q;

    fn call_parts<C: BodyCodec>(&self, query: Q, _codec: &C) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: self.url().to_string(),
            query: query_parts(&query)?,
            body: None,
        })
    }
}

impl<R, P: Serialize> Invocation for SafeApiWithPath<R, P> {
    type Args = P;

    fn call_parts<C: BodyCodec>(&self, path: P, _codec: &C) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: path_parts(self.url(), &path)?,
            ..CallParts::default()
        })
    }
}

impl<R, Q: Serialize, P: Serialize> Invocation for SafeApiWithQueryAndPath<R, Q, P> {
    type Args = (Q, P);

    fn call_parts<C: BodyCodec>(
        &self,
        (query, path): (Q, P),
        _codec: &C,
    ) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: path_parts(self.url(), &path)?,
            query: query_parts(&query)?,
            body: None,
        })
    }
}

impl<R, B: Serialize + 'static> Invocation for MutationApi<R, B> {
    type Args = B;

    fn call_parts<C: BodyCodec>(&self, body: B, codec: &C) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: self.url().to_string(),
            query: ParameterMap::new(),
            body: body_parts(&body, codec)?,
        })
    }
}

impl<R, B: Serialize + 'static, Q: Serialize> Invocation for MutationApiWithQuery<R, B, Q> {
    type Args = (Q, B);

    fn call_parts<C: BodyCodec>(
        &self,
        (query, body): (Q, B),
        codec: &C,
    ) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: self.url().to_string(),
            query: query_parts(&query)?,
            body: body_parts(&body, codec)?,
        })
    }
}

impl<R, B: Serialize + 'static, P: Serialize> Invocation for MutationApiWithPath<R, B, P> {
    type Args = (P, B);

    fn call_parts<C: BodyCodec>(
        &self,
        (path, body): (P, B),
        codec: &C,
    ) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: path_parts(self.url(), &path)?,
            query: ParameterMap::new(),
            body: body_parts(&body, codec)?,
        })
    }
}

impl<R, B, Q, P> Invocation for MutationApiWithQueryAndPath<R, B, Q, P>
where
    B: Serialize + 'static,
    Q: Serialize,
    P: Serialize,
{
    type Args = (Q, P, B);

    fn call_parts<C: BodyCodec>(
        &self,
        (query, path, body): (Q, P, B),
        codec: &C,
    ) -> Result<CallParts, ClientError> {
        Ok(CallParts {
            path: path_parts(self.url(), &path)?,
            query: query_parts(&query)?,
            body: body_parts(&body, codec)?,
        })
    }
}

/// Synchronous client that calls endpoints through their descriptors.
#[derive(Debug, Clone)]
pub struct ApiClient<T, C = JsonCodec> {
    base_url: String,
    transport: T,
    codec: C,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(base_url: &str, transport: T) -> Self {
        Self::with_codec(base_url, transport, JsonCodec)
    }
}

impl<T: Transport, C: BodyCodec> ApiClient<T, C> {
    pub fn with_codec(base_url: &str, transport: T, codec: C) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            codec,
        }
    }

    /// Build the request for `api` without sending it.
    pub fn build<D: Invocation>(&self, api: &D, args: D::Args) -> Result<HttpRequest, ClientError> {
        let parts = api.call_parts(args, &self.codec)?;

        let mut url = format!("{}{}", self.base_url, parts.path);
        if !parts.query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&parts.query.to_query_string());
        }

        let mut headers = Vec::new();
        if parts.body.is_some() {
            headers.push((
                "content-type".to_string(),
                self.codec.content_type().to_string(),
            ));
        }

        Ok(HttpRequest {
            method: api.http_method(),
            url,
            headers,
            body: parts.body,
        })
    }

    /// Check the status of `response` and decode its body.
    pub fn parse<R: DeserializeOwned>(&self, response: HttpResponse) -> Result<R, ClientError> {
        check_status(&response)?;
        Ok(self.codec.decode(&response.body)?)
    }

    pub fn invoke<D>(&self, api: &D, args: D::Args) -> Result<D::Response, ClientError>
    where
        D: Invocation,
        D::Response: DeserializeOwned,
    {
        self.invoke_with(api, args, |_| {})
    }

    /// Like `invoke`, with `customize` applied to the finished request right
    /// before it is sent, so it can override any default header.
    pub fn invoke_with<D, F>(
        &self,
        api: &D,
        args: D::Args,
        customize: F,
    ) -> Result<D::Response, ClientError>
    where
        D: Invocation,
        D::Response: DeserializeOwned,
        F: FnOnce(&mut HttpRequest),
    {
        let mut request = self.build(api, args)?;
        customize(&mut request);

        tracing::debug!(method = %request.method, url = %request.url, "sending request");
        let response = self
            .transport
            .execute(&request)
            .map_err(ClientError::Transport)?;
        tracing::debug!(
            status = response.status,
            url = %request.url,
            content_type = response.header("content-type").unwrap_or_default(),
            "received response"
        );

        self.parse(response)
    }
}

/// Map non-success status codes to the matching `ClientError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ClientError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ClientError::NotFound);
    }
    Err(ClientError::Status {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde::Deserialize;

    use super::*;
    use crate::descriptor::{MutationMethod, SafeMethod};
    use crate::error::CodecError;
    use crate::http::{HttpMethod, TransportError};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CommonObject {
        name: String,
    }

    #[derive(Serialize)]
    struct CommonPath {
        id: u64,
    }

    #[derive(Serialize)]
    struct CommonQuery {
        name: String,
    }

    #[derive(Serialize)]
    struct TagQuery {
        tag: Vec<String>,
    }

    /// Records requests and answers each with a canned response.
    struct Recorder {
        response: HttpResponse,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Recorder {
        fn answering(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.as_bytes().to_vec(),
                },
                seen: RefCell::new(Vec::new()),
            }
        }

        fn last(&self) -> HttpRequest {
            self.seen.borrow().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            Err("connection refused".into())
        }
    }

    fn client(transport: &Recorder) -> ApiClient<&Recorder> {
        ApiClient::new("http://localhost:3000/", transport)
    }

    #[test]
    fn safe_request_has_no_body() {
        let recorder = Recorder::answering(200, "{}");
        let api: SafeApi<CommonObject> = SafeApi::new("/");
        let req = client(&recorder).build(&api, ()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/");
        assert!(req.body.is_none());
        assert!(req.headers.is_empty());
    }

    #[test]
    fn options_method_is_used() {
        let recorder = Recorder::answering(200, "{}");
        let api: SafeApi<CommonObject> = SafeApi::with_method("/", SafeMethod::Options);
        let req = client(&recorder).build(&api, ()).unwrap();
        assert_eq!(req.method, HttpMethod::Options);
    }

    #[test]
    fn path_is_resolved_and_query_appended() {
        let recorder = Recorder::answering(200, "{}");
        let api: SafeApiWithQueryAndPath<CommonObject, CommonQuery, CommonPath> =
            SafeApiWithQueryAndPath::new("/user/{id}");
        let req = client(&recorder)
            .build(
                &api,
                (
                    CommonQuery {
                        name: "a b".to_string(),
                    },
                    CommonPath { id: 1 },
                ),
            )
            .unwrap();
        assert_eq!(req.url, "http://localhost:3000/user/1?name=a+b");
    }

    #[test]
    fn list_query_repeats_the_key() {
        let recorder = Recorder::answering(200, "{}");
        let api: SafeApiWithQuery<CommonObject, TagQuery> = SafeApiWithQuery::new("/items");
        let query = TagQuery {
            tag: vec!["x".to_string(), "y".to_string(), "z".to_string()],
        };
        let req = client(&recorder).build(&api, query).unwrap();
        assert_eq!(req.url, "http://localhost:3000/items?tag=x&tag=y&tag=z");
    }

    #[test]
    fn mutation_sends_encoded_body() {
        let recorder = Recorder::answering(200, "{}");
        let api: MutationApiWithPath<CommonObject, CommonObject, CommonPath> =
            MutationApiWithPath::with_method("/user/{id}", MutationMethod::Put);
        let body = CommonObject {
            name: "old".to_string(),
        };
        let req = client(&recorder)
            .build(&api, (CommonPath { id: 7 }, body))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:3000/user/7");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(&br#"{"name":"old"}"#[..]));
    }

    #[test]
    fn unit_body_is_not_sent() {
        let recorder = Recorder::answering(200, "{}");
        let api: MutationApiWithQuery<CommonObject, (), CommonQuery> =
            MutationApiWithQuery::with_method("/user", MutationMethod::Delete);
        let query = CommonQuery {
            name: "name".to_string(),
        };
        let req = client(&recorder).build(&api, (query, ())).unwrap();
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn customizer_runs_last() {
        let recorder = Recorder::answering(200, r#"{"name":"add"}"#);
        let api: MutationApi<CommonObject, CommonObject> = MutationApi::new("/user");
        let body = CommonObject {
            name: "add".to_string(),
        };
        let result = client(&recorder)
            .invoke_with(&api, body, |req| {
                req.set_header("Content-Type", "application/json; charset=utf-8");
            })
            .unwrap();
        assert_eq!(result.name, "add");
        let sent = recorder.last();
        assert_eq!(sent.headers.len(), 1);
        assert_eq!(
            sent.header("content-type"),
            Some("application/json; charset=utf-8")
        );
    }

    #[test]
    fn invoke_decodes_response() {
        let recorder = Recorder::answering(200, r#"{"name":"1"}"#);
        let api: SafeApiWithPath<CommonObject, CommonPath> = SafeApiWithPath::new("/user/{id}");
        let result = client(&recorder).invoke(&api, CommonPath { id: 1 }).unwrap();
        assert_eq!(result.name, "1");
        assert_eq!(recorder.last().url, "http://localhost:3000/user/1");
    }

    #[test]
    fn unit_response_accepts_empty_body() {
        let recorder = Recorder::answering(200, "");
        let api: MutationApi<(), ()> = MutationApi::with_method("/user", MutationMethod::Delete);
        assert!(client(&recorder).invoke(&api, ()).is_ok());
    }

    #[test]
    fn not_found_status() {
        let recorder = Recorder::answering(404, "");
        let api: SafeApi<CommonObject> = SafeApi::new("/");
        let err = client(&recorder).invoke(&api, ()).unwrap_err();
        assert!(matches!(err, ClientError::NotFound));
    }

    #[test]
    fn other_status_keeps_body() {
        let recorder = Recorder::answering(400, "missing required parameter `id`");
        let api: SafeApi<CommonObject> = SafeApi::new("/");
        match client(&recorder).invoke(&api, ()).unwrap_err() {
            ClientError::Status { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("`id`"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[test]
    fn bad_json_is_a_codec_error() {
        let recorder = Recorder::answering(200, "not json");
        let api: SafeApi<CommonObject> = SafeApi::new("/");
        let err = client(&recorder).invoke(&api, ()).unwrap_err();
        assert!(matches!(err, ClientError::Codec(CodecError::Decode(_))));
    }

    #[test]
    fn transport_failure_propagates() {
        let client = ApiClient::new("http://localhost:1", Unreachable);
        let api: SafeApi<CommonObject> = SafeApi::new("/");
        let err = client.invoke(&api, ()).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
