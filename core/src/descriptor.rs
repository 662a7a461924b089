//! Endpoint descriptors: one immutable value per endpoint, shared by the
//! client invoker and the server binder.
//!
//! # Design
//! The parameter layout is a closed set of eight types: {safe, mutation} x
//! {plain, with query, with path, with query and path}. Each type carries the
//! URL template and its method; response, body, query and path shapes are
//! zero-sized type tags. Descriptors can be built in `const` context:
//!
//! ```
//! use route_core::{SafeApiWithPath, SafeMethod};
//!
//! # struct User;
//! # struct UserPath;
//! const GET_USER: SafeApiWithPath<User, UserPath> = SafeApiWithPath::new("/user/{id}");
//! assert_eq!(GET_USER.method(), SafeMethod::Get);
//! ```

use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::http::HttpMethod;

/// Methods for descriptors without a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SafeMethod {
    #[default]
    Get,
    Options,
}

/// Methods for descriptors that carry a request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MutationMethod {
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl From<SafeMethod> for HttpMethod {
    fn from(method: SafeMethod) -> Self {
        match method {
            SafeMethod::Get => HttpMethod::Get,
            SafeMethod::Options => HttpMethod::Options,
        }
    }
}

impl From<MutationMethod> for HttpMethod {
    fn from(method: MutationMethod) -> Self {
        match method {
            MutationMethod::Post => HttpMethod::Post,
            MutationMethod::Put => HttpMethod::Put,
            MutationMethod::Patch => HttpMethod::Patch,
            MutationMethod::Delete => HttpMethod::Delete,
        }
    }
}

/// Which parameter structures a descriptor declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamShape {
    Plain,
    Query,
    Path,
    QueryAndPath,
}

impl ParamShape {
    pub fn has_query(self) -> bool {
        matches!(self, ParamShape::Query | ParamShape::QueryAndPath)
    }

    pub fn has_path(self) -> bool {
        matches!(self, ParamShape::Path | ParamShape::QueryAndPath)
    }
}

/// Common view over every descriptor type.
pub trait Descriptor {
    type Response;

    fn url(&self) -> &str;

    fn http_method(&self) -> HttpMethod;

    fn shape(&self) -> ParamShape;
}

/// Descriptors whose requests carry a body of type `Body`.
pub trait MutationDescriptor: Descriptor {
    type Body;
}

macro_rules! descriptor {
    (
        $(#[$doc:meta])*
        $name:ident<R $(, $param:ident)*>, $method:ident, $shape:ident
    ) => {
        $(#[$doc])*
        pub struct $name<R $(, $param)*> {
            url: Cow<'static, str>,
            method: $method,
            shapes: PhantomData<fn() -> (R $(, $param)*)>,
        }

        impl<R $(, $param)*> $name<R $(, $param)*> {
            /// Descriptor using the family's default method.
            pub const fn new(url: &'static str) -> Self {
                Self::with_method(url, <$method>::DEFAULT)
            }

            pub const fn with_method(url: &'static str, method: $method) -> Self {
                Self {
                    url: Cow::Borrowed(url),
                    method,
                    shapes: PhantomData,
                }
            }

            /// Descriptor for a template only known at runtime.
            pub fn from_url(url: impl Into<String>, method: $method) -> Self {
                Self {
                    url: Cow::Owned(url.into()),
                    method,
                    shapes: PhantomData,
                }
            }

            pub fn url(&self) -> &str {
                &self.url
            }

            pub fn method(&self) -> $method {
                self.method
            }
        }

        impl<R $(, $param)*> Descriptor for $name<R $(, $param)*> {
            type Response = R;

            fn url(&self) -> &str {
                &self.url
            }

            fn http_method(&self) -> HttpMethod {
                self.method.into()
            }

            fn shape(&self) -> ParamShape {
                ParamShape::$shape
            }
        }

        impl<R $(, $param)*> Clone for $name<R $(, $param)*> {
            fn clone(&self) -> Self {
                Self {
                    url: self.url.clone(),
                    method: self.method,
                    shapes: PhantomData,
                }
            }
        }

        impl<R $(, $param)*> fmt::Debug for $name<R $(, $param)*> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("url", &self.url)
                    .field("method", &self.method)
                    .finish()
            }
        }
    };
}

impl SafeMethod {
    const DEFAULT: SafeMethod = SafeMethod::Get;
}

impl MutationMethod {
    const DEFAULT: MutationMethod = MutationMethod::Post;
}

descriptor! {
    /// Body-less endpoint without parameters.
    SafeApi<R>, SafeMethod, Plain
}

descriptor! {
    /// Body-less endpoint with query parameters of shape `Q`.
    SafeApiWithQuery<R, Q>, SafeMethod, Query
}

descriptor! {
    /// Body-less endpoint whose URL template is filled from `P`.
    SafeApiWithPath<R, P>, SafeMethod, Path
}

descriptor! {
    SafeApiWithQueryAndPath<R, Q, P>, SafeMethod, QueryAndPath
}

descriptor! {
    /// Body-carrying endpoint without parameters.
    MutationApi<R, B>, MutationMethod, Plain
}

descriptor! {
    MutationApiWithQuery<R, B, Q>, MutationMethod, Query
}

descriptor! {
    MutationApiWithPath<R, B, P>, MutationMethod, Path
}

descriptor! {
    MutationApiWithQueryAndPath<R, B, Q, P>, MutationMethod, QueryAndPath
}

impl<R, B> MutationDescriptor for MutationApi<R, B> {
    type Body = B;
}

impl<R, B, Q> MutationDescriptor for MutationApiWithQuery<R, B, Q> {
    type Body = B;
}

impl<R, B, P> MutationDescriptor for MutationApiWithPath<R, B, P> {
    type Body = B;
}

impl<R, B, Q, P> MutationDescriptor for MutationApiWithQueryAndPath<R, B, Q, P> {
    type Body = B;
}
