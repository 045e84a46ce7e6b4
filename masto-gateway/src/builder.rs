//! Gateway builder.
//!
//! Provides a fluent API for configuring and building a [`Gateway`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use masto_gateway_core::{KeyCase, parse_version};
use rustls::ClientConfig;

use crate::client::Gateway;
use crate::config::{GatewayConfig, default_streaming_uri};
use crate::request::parse_base;
use crate::transport::{HyperTransport, Transport};
use crate::{CallOptions, GatewayError};

/// Instance URI, e.g. `https://mastodon.social`. Required by [`GatewayBuilder::from_env`].
pub const ENV_URI: &str = "MASTO_URI";
/// Streaming API URI, e.g. `wss://streaming.mastodon.social`.
pub const ENV_STREAMING_URI: &str = "MASTO_STREAMING_URI";
/// Bearer token.
pub const ENV_ACCESS_TOKEN: &str = "MASTO_ACCESS_TOKEN";
/// Server version, e.g. `4.2.0`.
pub const ENV_VERSION: &str = "MASTO_VERSION";
/// Default request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "MASTO_TIMEOUT_SECS";

/// Builder for creating a [`Gateway`].
///
/// # Example
///
/// ```ignore
/// use masto_gateway::Gateway;
/// use std::time::Duration;
///
/// let gateway = Gateway::builder("https://mastodon.social")
///     .access_token("token")
///     .version("4.2.0")
///     .timeout(Duration::from_secs(30))
///     .build()?;
/// ```
#[derive(Clone)]
pub struct GatewayBuilder {
    base_uri: String,
    streaming_uri: Option<String>,
    access_token: Option<String>,
    version: Option<String>,
    default_options: CallOptions,
    key_case: KeyCase,
    tls_config: Option<Arc<ClientConfig>>,
}

impl std::fmt::Debug for GatewayBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayBuilder")
            .field("base_uri", &self.base_uri)
            .field("streaming_uri", &self.streaming_uri)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("version", &self.version)
            .field("default_options", &self.default_options)
            .field("key_case", &self.key_case)
            .field("tls_config", &self.tls_config.is_some())
            .finish()
    }
}

impl GatewayBuilder {
    /// Create a new builder for the instance at `base_uri`.
    pub fn new<S: Into<String>>(base_uri: S) -> Self {
        Self {
            base_uri: base_uri.into(),
            streaming_uri: None,
            access_token: None,
            version: None,
            default_options: CallOptions::default(),
            key_case: KeyCase::default(),
            tls_config: None,
        }
    }

    /// Build a builder from environment variables.
    ///
    /// Required:
    /// - `MASTO_URI`
    ///
    /// Optional:
    /// - `MASTO_STREAMING_URI`: derived from `MASTO_URI` when absent
    /// - `MASTO_ACCESS_TOKEN`
    /// - `MASTO_VERSION`
    /// - `MASTO_TIMEOUT_SECS`: no timeout when absent
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup(ENV_URI).ok_or_else(|| GatewayError::Config(format!("{ENV_URI} is not set")))?;
        let mut builder = Self::new(uri);
        builder.streaming_uri = lookup(ENV_STREAMING_URI);
        builder.access_token = lookup(ENV_ACCESS_TOKEN);
        builder.version = lookup(ENV_VERSION);
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| GatewayError::Config(format!("{ENV_TIMEOUT_SECS}: invalid number {raw:?}")))?;
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(builder)
    }

    /// Set the streaming API URI.
    ///
    /// When unset, it is derived from the base URI (`https` → `wss`).
    pub fn streaming_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.streaming_uri = Some(uri.into());
        self
    }

    /// Set the bearer token sent with every request.
    pub fn access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set the server version used by version gates and streaming.
    pub fn version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set default options merged under every call.
    pub fn default_options(mut self, options: CallOptions) -> Self {
        self.default_options = options;
        self
    }

    /// Set the default timeout for every call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_options = self.default_options.timeout(timeout);
        self
    }

    /// Set the key convention payloads are presented in.
    ///
    /// Default: [`KeyCase::Camel`].
    pub fn key_case(mut self, key_case: KeyCase) -> Self {
        self.key_case = key_case;
        self
    }

    /// Use a custom TLS configuration for HTTP and WebSocket connections.
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Build a gateway on the default [`HyperTransport`].
    pub fn build(self) -> Result<Gateway, GatewayError> {
        let mut transport = HyperTransport::builder();
        if let Some(config) = &self.tls_config {
            transport = transport.tls_config(Arc::clone(config));
        }
        let transport = transport.build()?;
        let tls = transport.tls_config();
        self.finish(transport, Some(tls))
    }

    /// Build a gateway on a custom transport.
    pub fn build_with<S: Transport>(self, transport: S) -> Result<Gateway<S>, GatewayError> {
        let tls = self.tls_config.clone();
        self.finish(transport, tls)
    }

    fn finish<S: Transport>(
        self,
        transport: S,
        tls: Option<Arc<ClientConfig>>,
    ) -> Result<Gateway<S>, GatewayError> {
        let config = self.into_config()?;
        Ok(Gateway::new(transport, Arc::new(RwLock::new(config)), tls))
    }

    pub(crate) fn into_config(self) -> Result<GatewayConfig, GatewayError> {
        let base_uri = parse_base(&self.base_uri)?;
        let streaming_uri = match &self.streaming_uri {
            Some(uri) => parse_base(uri)?,
            None => default_streaming_uri(&base_uri),
        };
        let remote_version = self.version.as_deref().map(parse_version).transpose()?;
        Ok(GatewayConfig {
            base_uri,
            streaming_uri,
            access_token: self.access_token,
            remote_version,
            default_options: self.default_options,
            key_case: self.key_case,
        })
    }
}

/// Parameters for [`Gateway::login`].
///
/// The streaming URI and version are discovered from the instance.
#[derive(Debug, Clone)]
pub struct LoginParams {
    /// Instance URI.
    pub uri: String,
    /// Bearer token, if the caller has one.
    pub access_token: Option<String>,
    /// Options merged under every call.
    pub default_options: CallOptions,
}

impl LoginParams {
    /// Log in to the instance at `uri`.
    pub fn new<S: Into<String>>(uri: S) -> Self {
        Self {
            uri: uri.into(),
            access_token: None,
            default_options: CallOptions::default(),
        }
    }

    /// Set the bearer token.
    pub fn access_token<S: Into<String>>(mut self, token: S) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Set default call options.
    pub fn default_options(mut self, options: CallOptions) -> Self {
        self.default_options = options;
        self
    }
}

impl From<LoginParams> for GatewayBuilder {
    fn from(params: LoginParams) -> Self {
        let mut builder = GatewayBuilder::new(params.uri).default_options(params.default_options);
        builder.access_token = params.access_token;
        builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use semver::Version;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_builder_config() {
        let config = GatewayBuilder::new("https://example.com")
            .access_token("token token")
            .version("1.2.3")
            .into_config()
            .unwrap();
        assert_eq!(config.access_token(), Some("token token"));
        assert_eq!(config.remote_version(), Some(&Version::new(1, 2, 3)));
        assert_eq!(config.streaming_uri().to_string(), "wss://example.com/");
        assert_eq!(config.key_case(), KeyCase::Camel);
    }

    #[test]
    fn test_builder_explicit_streaming_uri() {
        let config = GatewayBuilder::new("https://example.com")
            .streaming_uri("wss://example.com")
            .version("0.0.0")
            .into_config()
            .unwrap();
        assert_eq!(config.streaming_uri().to_string(), "wss://example.com/");
    }

    #[test]
    fn test_builder_rejects_bad_input() {
        assert!(matches!(
            GatewayBuilder::new("not a url").into_config(),
            Err(GatewayError::InvalidUrl(_))
        ));
        assert!(matches!(
            GatewayBuilder::new("https://example.com").version("latest").into_config(),
            Err(GatewayError::InvalidVersion(_))
        ));
    }

    #[test]
    fn test_from_env() {
        let builder = GatewayBuilder::from_lookup(lookup(&[
            (ENV_URI, "https://example.com"),
            (ENV_ACCESS_TOKEN, "secret"),
            (ENV_VERSION, "4.2.0"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();
        let config = builder.into_config().unwrap();
        assert_eq!(config.base_uri().to_string(), "https://example.com/");
        assert_eq!(config.access_token(), Some("secret"));
        assert_eq!(config.remote_version(), Some(&Version::new(4, 2, 0)));
        assert_eq!(config.default_options().get_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_env_missing_uri() {
        let err = GatewayBuilder::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, GatewayError::Config(msg) if msg.contains(ENV_URI)));
    }

    #[test]
    fn test_from_env_bad_timeout() {
        let err = GatewayBuilder::from_lookup(lookup(&[
            (ENV_URI, "https://example.com"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let builder = GatewayBuilder::new("https://example.com").access_token("secret");
        assert!(!format!("{builder:?}").contains("secret"));
    }

    #[test]
    fn test_login_params_into_builder() {
        let config = GatewayBuilder::from(LoginParams::new("https://example.com").access_token("t"))
            .into_config()
            .unwrap();
        assert_eq!(config.access_token(), Some("t"));
        assert!(config.remote_version().is_none());
    }
}
