//! Gateway configuration.
//!
//! A [`Gateway`](crate::Gateway) keeps one [`GatewayConfig`] behind a lock.
//! Every request takes a snapshot when it starts, so later changes only
//! affect requests started afterwards.

use http::Uri;
use masto_gateway_core::KeyCase;
use semver::Version;

use crate::CallOptions;

/// Connection settings shared by every call made through a gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub(crate) base_uri: Uri,
    pub(crate) streaming_uri: Uri,
    pub(crate) access_token: Option<String>,
    pub(crate) remote_version: Option<Version>,
    pub(crate) default_options: CallOptions,
    pub(crate) key_case: KeyCase,
}

impl GatewayConfig {
    /// URI every request path is joined with.
    pub fn base_uri(&self) -> &Uri {
        &self.base_uri
    }

    /// URI every stream path is joined with.
    pub fn streaming_uri(&self) -> &Uri {
        &self.streaming_uri
    }

    /// Bearer credential, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Version advertised by the server, if known.
    pub fn remote_version(&self) -> Option<&Version> {
        self.remote_version.as_ref()
    }

    /// Options merged under every call.
    pub fn default_options(&self) -> &CallOptions {
        &self.default_options
    }

    /// Key convention payloads are presented in.
    pub fn key_case(&self) -> KeyCase {
        self.key_case
    }

    /// Case applied to outgoing payloads.
    pub(crate) fn outgoing_case(&self) -> KeyCase {
        match self.key_case {
            KeyCase::Preserve => KeyCase::Preserve,
            _ => KeyCase::Snake,
        }
    }
}

/// Derive a streaming URI from an HTTP base URI: `https` becomes `wss`,
/// `http` becomes `ws`.
pub(crate) fn default_streaming_uri(base: &Uri) -> Uri {
    let scheme = match base.scheme_str() {
        Some("https") => "wss",
        Some("http") => "ws",
        _ => return base.clone(),
    };
    let mut parts = base.clone().into_parts();
    parts.scheme = scheme.parse().ok();
    Uri::from_parts(parts).unwrap_or_else(|_| base.clone())
}
