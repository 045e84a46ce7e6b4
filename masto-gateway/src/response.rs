//! Response types for the gateway.
//!
//! This module provides the [`GatewayResponse`] type which wraps a normalized
//! payload along with the raw headers from the server.

pub(crate) mod error_parser;

use bytes::Bytes;
use http::HeaderMap;
use masto_gateway_core::{LINK_HEADER, next_link};
use serde_json::Value;
use std::ops::Deref;

/// Response wrapper for gateway calls.
///
/// Contains the payload, with keys already in the caller's convention, and
/// the response headers exactly as the server sent them.
///
/// # Example
///
/// ```ignore
/// let response = gateway.get::<Vec<Status>, _>("/api/v1/timelines/home", &()).await?;
///
/// // Access the payload directly via Deref
/// println!("{} statuses", response.len());
///
/// // Follow pagination by hand
/// if let Some(next) = response.metadata().next_link() {
///     println!("more at {next}");
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GatewayResponse<T> {
    /// The response payload.
    inner: T,
    /// Response metadata (HTTP headers).
    metadata: Metadata,
}

impl<T> GatewayResponse<T> {
    /// Create a new response with the given value and metadata.
    pub fn new(inner: T, metadata: Metadata) -> Self {
        Self { inner, metadata }
    }

    /// Extract the inner value, discarding metadata.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Get a reference to the response metadata.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Transform the inner value, preserving metadata.
    pub fn map<U, F>(self, f: F) -> GatewayResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        GatewayResponse {
            inner: f(self.inner),
            metadata: self.metadata,
        }
    }

    /// Fallible variant of [`map`](Self::map).
    pub fn try_map<U, E, F>(self, f: F) -> Result<GatewayResponse<U>, E>
    where
        F: FnOnce(T) -> Result<U, E>,
    {
        Ok(GatewayResponse {
            inner: f(self.inner)?,
            metadata: self.metadata,
        })
    }

    /// Get a reference to the inner value.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Decompose into inner value and metadata.
    pub fn into_parts(self) -> (T, Metadata) {
        (self.inner, self.metadata)
    }
}

impl<T> Deref for GatewayResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> AsRef<T> for GatewayResponse<T> {
    fn as_ref(&self) -> &T {
        &self.inner
    }
}

/// Response metadata wrapper around HTTP headers.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    headers: HeaderMap,
}

impl Metadata {
    /// Create new metadata from HTTP headers.
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Get a header value as a string.
    ///
    /// Returns `None` if the header is missing or not valid UTF-8.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// Check if a header exists.
    pub fn contains(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Get a reference to the underlying headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Consume and return the underlying headers.
    pub fn into_headers(self) -> HeaderMap {
        self.headers
    }

    /// The raw `Link` header, if present.
    pub fn link(&self) -> Option<&str> {
        self.get(LINK_HEADER)
    }

    /// The `rel="next"` URL of the `Link` header, if present.
    pub fn next_link(&self) -> Option<&str> {
        self.link().and_then(next_link)
    }
}

/// Parse a successful response body.
///
/// Empty bodies become `null`; bodies that are not JSON are returned as a
/// JSON string holding the raw text.
pub(crate) fn parse_body(body: &Bytes) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}
