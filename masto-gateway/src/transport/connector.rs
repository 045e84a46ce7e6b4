//! TLS connector setup for the hyper client and the WebSocket dialer.
//!
//! Both share one rustls [`ClientConfig`] built on the ring provider. Root
//! certificates come from the enabled feature:
//!
//! - `tls-native-roots` - system root certificates (preferred if both are on)
//! - `tls-webpki-roots` - bundled Mozilla root certificates

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::{ClientConfig, RootCertStore};

use crate::GatewayError;

/// Build the default TLS configuration.
///
/// ALPN is left unset; the HTTP connector adds its own protocols on a copy,
/// and the WebSocket handshake must stay on HTTP/1.1.
pub fn default_tls_config() -> Result<ClientConfig, GatewayError> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| GatewayError::Transport(format!("tls setup failed: {e}")))?
        .with_root_certificates(root_store())
        .with_no_client_auth();
    Ok(config)
}

fn root_store() -> RootCertStore {
    #[allow(unused_mut)]
    let mut roots = RootCertStore::empty();

    #[cfg(feature = "tls-native-roots")]
    {
        let native = rustls_native_certs::load_native_certs();
        #[cfg(feature = "tracing")]
        if !native.errors.is_empty() {
            tracing::debug!(errors = ?native.errors, "errors loading native certs");
        }
        roots.add_parsable_certificates(native.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    roots
}

/// Build an HTTPS connector that also accepts plain `http://` URIs.
pub fn build_https_connector(config: &ClientConfig) -> HttpsConnector<HttpConnector> {
    HttpsConnectorBuilder::new()
        .with_tls_config(config.clone())
        .https_or_http()
        .enable_http1()
        .enable_http2()
        .build()
}
