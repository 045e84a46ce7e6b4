//! HTTP and WebSocket gateway for Mastodon-compatible servers.
//!
//! This crate is the transport core of a Mastodon API client: it turns
//! logical calls (verb, path, payload) into HTTP exchanges, normalizes
//! responses, and exposes link-paginated collections and streaming events.
//!
//! ## Features
//!
//! - GET/POST/PUT/PATCH/DELETE calls with JSON, multipart or raw bodies
//! - Key convention translation (`camelCase` in Rust, `snake_case` on the wire)
//! - Classified errors for the statuses the API documents
//! - Version gates for operations tied to a server version range
//! - Cursors over `Link`-paginated collections
//! - Typed event streams over WebSocket
//!
//! ## Example
//!
//! ```ignore
//! use masto_gateway::{Gateway, LoginParams};
//! use serde_json::{Value, json};
//!
//! // Discover the version and streaming URL from the instance
//! let gateway = Gateway::login(LoginParams::new("https://mastodon.social").access_token("token")).await?;
//!
//! let account = gateway
//!     .get::<Value, _>("/api/v1/accounts/verify_credentials", &())
//!     .await?;
//! println!("{}", account["displayName"]);
//!
//! let status = gateway
//!     .post::<Value, _>("/api/v1/statuses", &json!({"status": "hello", "inReplyToId": null}))
//!     .await?;
//! ```
//!
//! ## Pagination
//!
//! ```ignore
//! use masto_gateway::PageDirective;
//!
//! let mut followers = gateway.paginate::<Vec<Value>, _>("/api/v1/accounts/1/followers", &())?;
//! while let Some(page) = followers.next_page().await? {
//!     println!("{} accounts", page.len());
//! }
//!
//! // Back to the first page
//! followers.advance(Some(PageDirective::Reset)).await?;
//! ```
//!
//! ## Streaming
//!
//! ```ignore
//! use futures::StreamExt;
//!
//! let mut events = gateway
//!     .stream::<Value, _>("/api/v1/streaming", &json!({"stream": "public"}))
//!     .await?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event?);
//! }
//! ```
//!
//! ## Errors
//!
//! Every operation returns [`GatewayError`]. Statuses 401, 403, 404, 409,
//! 410, 422 and 429 become [`GatewayError::Api`] with an [`ErrorKind`] and
//! the server's message. Any other failed status comes back as
//! [`GatewayError::Http`] with the response untouched. Nothing is retried.
//!
//! ## Custom Transports
//!
//! The gateway runs on any [`Transport`], a `tower::Service` from
//! `http::Request<TransportBody>` to `http::Response<Bytes>`. The default is
//! [`HyperTransport`]. Tests can plug in `tower::service_fn`.
//!
//! ## Configuration
//!
//! [`GatewayBuilder::from_env`] reads:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `MASTO_URI` | Instance URI (required) |
//! | `MASTO_STREAMING_URI` | Streaming API URI |
//! | `MASTO_ACCESS_TOKEN` | Bearer token |
//! | `MASTO_VERSION` | Server version |
//! | `MASTO_TIMEOUT_SECS` | Default request timeout |
//!
//! ## Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `tls-native-roots` (default) | Trust the platform's root certificates | `rustls-native-certs` |
//! | `tls-webpki-roots` | Trust the Mozilla root set | `webpki-roots` |
//! | `tracing` | Spans for requests, events for pagination and streams | `tracing` |
//!
//! When `tracing` is enabled, each request creates a `gateway.request` span with:
//! - `http.method`: Request verb
//! - `url.path`: Path as given by the caller
//! - `otel.kind`: "client"

mod builder;
mod client;
pub mod config;
mod error;
mod options;
pub mod paginate;
pub mod request;
pub mod response;
pub mod streaming;
pub mod transport;

pub use builder::{
    ENV_ACCESS_TOKEN, ENV_STREAMING_URI, ENV_TIMEOUT_SECS, ENV_URI, ENV_VERSION, GatewayBuilder,
    LoginParams,
};
pub use client::{Gateway, INSTANCE_PATH};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use options::CallOptions;

pub use paginate::{PageDirective, PageState, Paginator};
pub use request::RequestDescriptor;
pub use request::encoder::{APPLICATION_JSON, MULTIPART_FORM_DATA};
pub use response::{GatewayResponse, Metadata};
pub use streaming::{EventStream, SUBPROTOCOL_TOKEN_SINCE};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, Transport, TransportBody};

// Re-export core types that users need
pub use masto_gateway_core::{
    ApiError, Available, ErrorKind, Gated, KeyCase, VersionError, VersionRange, Versioned,
    available, flatten, flatten_with_prefix, guard, next_link, parse_version, transform_keys,
    unflatten,
};

pub use bytes::Bytes;
