//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the default transport behind a
//! [`Gateway`](crate::Gateway), using hyper_util's legacy client.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tower_service::Service;

use super::body::TransportBody;
use super::connector::{build_https_connector, default_tls_config};
use crate::GatewayError;

/// Type alias for the hyper client with HTTPS connector.
type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// HTTP transport using hyper_util's legacy client.
///
/// Responses are buffered in full before they are handed to the gateway.
/// The TLS configuration is kept so WebSocket streams can dial with the same
/// roots.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    tls: Arc<ClientConfig>,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a new transport builder.
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, GatewayError> {
        Self::builder().build()
    }

    /// The TLS configuration shared with WebSocket connections.
    pub fn tls_config(&self) -> Arc<ClientConfig> {
        Arc::clone(&self.tls)
    }
}

async fn exchange(
    client: HyperClient,
    request: http::Request<TransportBody>,
) -> Result<http::Response<Bytes>, GatewayError> {
    let response: http::Response<Incoming> = client
        .request(request)
        .await
        .map_err(|e| GatewayError::Transport(format!("request failed: {e}")))?;
    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| GatewayError::Transport(format!("failed to read response body: {e}")))?
        .to_bytes();
    Ok(http::Response::from_parts(parts, body))
}

/// Builder for [`HyperTransport`].
///
/// # Example
///
/// ```ignore
/// use masto_gateway::transport::HyperTransportBuilder;
/// use std::time::Duration;
///
/// let transport = HyperTransportBuilder::new()
///     .pool_idle_timeout(Duration::from_secs(90))
///     .build()?;
/// ```
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<Arc<ClientConfig>>,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    /// Create a new transport builder with default settings.
    pub fn new() -> Self {
        Self {
            tls_config: None,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Set a custom TLS configuration.
    ///
    /// Use this to configure custom root certificates or client certificates.
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Set the connection pool idle timeout.
    ///
    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Set the maximum number of idle connections per host.
    ///
    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<HyperTransport, GatewayError> {
        let tls = match self.tls_config {
            Some(config) => config,
            None => Arc::new(default_tls_config()?),
        };
        let connector = build_https_connector(&tls);

        let mut builder = Client::builder(TokioExecutor::new());
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);

        Ok(HyperTransport {
            client: builder.build(connector),
            tls,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}

impl Service<http::Request<TransportBody>> for HyperTransport {
    type Response = http::Response<Bytes>;
    type Error = GatewayError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // hyper_util legacy::Client is always ready
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<TransportBody>) -> Self::Future {
        Box::pin(exchange(self.client.clone(), req))
    }
}
