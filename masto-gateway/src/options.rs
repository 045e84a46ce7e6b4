//! Call options for per-request configuration.
//!
//! This module provides [`CallOptions`] for configuring individual requests
//! with timeouts, custom headers and a content type.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Options for configuring individual requests.
///
/// The gateway keeps a set of default options; per-call options are merged
/// over them and win on every field they set.
///
/// # Example
///
/// ```
/// use masto_gateway::CallOptions;
/// use std::time::Duration;
///
/// let options = CallOptions::new()
///     .timeout(Duration::from_secs(5))
///     .content_type("multipart/form-data")
///     .try_header("idempotency-key", "c0ffee")
///     .unwrap();
///
/// assert_eq!(options.get_timeout(), Some(Duration::from_secs(5)));
/// assert_eq!(options.get_content_type(), Some("multipart/form-data"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Timeout for this specific call.
    pub(crate) timeout: Option<Duration>,
    /// Custom headers for this specific call.
    pub(crate) headers: HeaderMap,
}

impl CallOptions {
    /// Create new default call options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout for this call.
    ///
    /// The whole exchange, including reading the body, must complete in time
    /// or the call fails with [`GatewayError::Timeout`](crate::GatewayError::Timeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the configured timeout, if any.
    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Add a custom header for this call, replacing earlier values.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Try to add a custom header for this call.
    ///
    /// Returns `None` if the header name or value is invalid.
    pub fn try_header<K, V>(self, name: K, value: V) -> Option<Self>
    where
        K: TryInto<HeaderName>,
        V: TryInto<HeaderValue>,
    {
        let name = name.try_into().ok()?;
        let value = value.try_into().ok()?;
        Some(self.header(name, value))
    }

    /// Set all custom headers for this call, replacing any existing headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Get the custom headers for this call.
    pub fn get_headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Declare the media type of the request body.
    ///
    /// Defaults to `application/json` when unset.
    pub fn content_type(self, mime: &'static str) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static(mime))
    }

    /// Get the declared media type, if any.
    pub fn get_content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Merge these options over `defaults`.
    ///
    /// Fields set here win; headers are replaced by name, so a header present
    /// in both keeps only this call's values.
    pub(crate) fn merged_over(&self, defaults: &CallOptions) -> CallOptions {
        let mut headers = defaults.headers.clone();
        for name in self.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }
        CallOptions {
            timeout: self.timeout.or(defaults.timeout),
            headers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_default() {
        let options = CallOptions::new();
        assert!(options.get_timeout().is_none());
        assert!(options.get_headers().is_empty());
        assert!(options.get_content_type().is_none());
    }

    #[test]
    fn test_try_header_invalid() {
        assert!(CallOptions::new().try_header("bad header", "v").is_none());
        assert!(CallOptions::new().try_header("x-ok", "bad\nvalue").is_none());
    }

    #[test]
    fn test_call_specific_wins() {
        let defaults = CallOptions::new()
            .timeout(Duration::from_secs(30))
            .try_header("x-a", "default")
            .unwrap()
            .try_header("x-b", "default")
            .unwrap();
        let call = CallOptions::new()
            .timeout(Duration::from_secs(1))
            .try_header("x-a", "call")
            .unwrap();

        let merged = call.merged_over(&defaults);
        assert_eq!(merged.get_timeout(), Some(Duration::from_secs(1)));
        assert_eq!(merged.get_headers()["x-a"], "call");
        assert_eq!(merged.get_headers()["x-b"], "default");
        assert_eq!(merged.get_headers().get_all("x-a").iter().count(), 1);
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let defaults = CallOptions::new().timeout(Duration::from_secs(30));
        let merged = CallOptions::new().merged_over(&defaults);
        assert_eq!(merged.get_timeout(), Some(Duration::from_secs(30)));
    }
}
