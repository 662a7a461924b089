//! Server side of the route contracts: binds descriptors to axum routes.
//!
//! # Design
//! - `binder::ApiRouter` registers one route per descriptor and runs
//!   parameter decoding plus the handler inside one failure boundary.
//! - `responder` holds the commit-once response slot and the default result
//!   handler; `error` classifies handler failures into HTTP statuses.
//! - `directory` is a demo service served by the `user-directory` binary.

pub mod binder;
pub mod config;
pub mod directory;
pub mod error;
pub mod responder;

use axum::Router;
use tokio::net::TcpListener;

pub use binder::{ApiRouter, Outcome, Payload};
pub use config::ServerConfig;
pub use error::{translate, HandlerError};
pub use responder::{respond_default, RespondError, Responder};

/// Serve `router` until the listener fails.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, "listening");
    }
    axum::serve(listener, router).await
}

/// Serve the demo user directory.
pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, directory::app()).await
}
