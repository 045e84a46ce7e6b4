//! HTTP transport layer for the gateway.
//!
//! This module provides the [`HyperTransport`] type, which handles HTTP communication
//! using hyper_util's legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with protocol negotiation via ALPN
//! - TLS with rustls (ring provider)
//! - Connection pooling
//!
//! The gateway only talks to its transport through the [`Transport`] service
//! seam, so any `tower` service with the right signature can stand in for it.
//!
//! # Feature Flags
//!
//! - `tls-native-roots` (default) - Use system root certificates
//! - `tls-webpki-roots` - Use bundled Mozilla root certificates
//!
//! # Example
//!
//! ```ignore
//! use masto_gateway::transport::HyperTransport;
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//! ```

mod body;
mod connector;
mod hyper;

pub use body::TransportBody;
pub use connector::{build_https_connector, default_tls_config};
pub use self::hyper::{HyperTransport, HyperTransportBuilder};

use bytes::Bytes;
use tower_service::Service;

use crate::GatewayError;

/// A request/response exchange the gateway can dispatch through.
///
/// Implemented for every cloneable `tower` service taking an
/// `http::Request<TransportBody>` and producing a fully buffered
/// `http::Response<Bytes>`.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use masto_gateway::{Gateway, GatewayError, TransportBody};
///
/// let transport = tower::service_fn(|_req: http::Request<TransportBody>| async {
///     Ok::<_, GatewayError>(http::Response::new(Bytes::from_static(b"{}")))
/// });
/// let gateway = Gateway::builder("https://example.com").build_with(transport).unwrap();
/// ```
pub trait Transport:
    Service<
        http::Request<TransportBody>,
        Response = http::Response<Bytes>,
        Error = GatewayError,
        Future: Send,
    > + Clone
    + Send
    + Sync
    + 'static
{
}

impl<S> Transport for S where
    S: Service<
            http::Request<TransportBody>,
            Response = http::Response<Bytes>,
            Error = GatewayError,
            Future: Send,
        > + Clone
        + Send
        + Sync
        + 'static
{
}
