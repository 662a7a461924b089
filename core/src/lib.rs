//! Typed API contracts shared by HTTP clients and servers.
//!
//! # Overview
//! An endpoint is described once by a descriptor (URL template, method,
//! query/path/body/response shapes). The client side turns a descriptor plus
//! arguments into an `HttpRequest`; the server side (`route-server`) binds the
//! same descriptor to a route handler. Nobody writes URLs or query strings by
//! hand.
//!
//! # Design
//! - `descriptor` is the closed set of eight endpoint types.
//! - `params` encodes path/query structures to a flat `ParameterMap` and back;
//!   `template` substitutes path values into `{name}` placeholders.
//! - `codec` owns request/response bodies (`JsonCodec` by default).
//! - `client` builds and parses plain-data `HttpRequest`/`HttpResponse`
//!   values; the network round-trip is a `Transport` (host-does-IO).
//! - `UreqTransport` (feature `ureq`) is a ready-made blocking transport.

pub mod client;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod params;
pub mod template;
#[cfg(feature = "ureq")]
pub mod transport;

pub use client::{ApiClient, CallParts, Invocation};
pub use codec::{is_unit, BodyCodec, JsonCodec};
pub use descriptor::{
    Descriptor, MutationApi, MutationApiWithPath, MutationApiWithQuery,
    MutationApiWithQueryAndPath, MutationDescriptor, MutationMethod, ParamShape, SafeApi,
    SafeApiWithPath, SafeApiWithQuery, SafeApiWithQueryAndPath, SafeMethod,
};
pub use error::{ClientError, CodecError, ParamError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use params::ParameterMap;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
