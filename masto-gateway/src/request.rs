//! Request types for the gateway.
//!
//! - [`RequestDescriptor`]: one logical call (verb, path, payload, options)
//! - URL resolution against the configured base URI

pub(crate) mod encoder;

use http::uri::PathAndQuery;
use http::{Method, Uri};
use serde_json::Value;

use crate::{CallOptions, GatewayError};

/// A single logical call, built by the caller and consumed by
/// [`Gateway::send`](crate::Gateway::send).
///
/// # Example
///
/// ```
/// use masto_gateway::{CallOptions, RequestDescriptor};
/// use serde_json::json;
///
/// let request = RequestDescriptor::post("/api/v1/statuses")
///     .payload(json!({"status": "hello", "mediaIds": ["1"]}))
///     .options(CallOptions::new().content_type("multipart/form-data"));
///
/// assert_eq!(request.method(), http::Method::POST);
/// ```
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path: String,
    payload: Option<Value>,
    options: CallOptions,
}

impl RequestDescriptor {
    /// Create a descriptor for `method` on `path`.
    ///
    /// `path` is joined with the gateway's base URI unless it is an absolute
    /// URL, in which case it is used as is.
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Self {
            method,
            path: path.into(),
            payload: None,
            options: CallOptions::default(),
        }
    }

    /// GET `path`.
    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::GET, path)
    }

    /// POST `path`.
    pub fn post<P: Into<String>>(path: P) -> Self {
        Self::new(Method::POST, path)
    }

    /// PUT `path`.
    pub fn put<P: Into<String>>(path: P) -> Self {
        Self::new(Method::PUT, path)
    }

    /// PATCH `path`.
    pub fn patch<P: Into<String>>(path: P) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// DELETE `path`.
    pub fn delete<P: Into<String>>(path: P) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a payload. GET sends it as query parameters, other verbs as the body.
    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Attach optional payload.
    pub fn maybe_payload(mut self, payload: Option<Value>) -> Self {
        self.payload = payload;
        self
    }

    /// Set per-call options.
    pub fn options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// The HTTP method.
    pub fn method(&self) -> Method {
        self.method.clone()
    }

    /// The path or absolute URL.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The payload, if any.
    pub fn get_payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// The per-call options.
    pub fn get_options(&self) -> &CallOptions {
        &self.options
    }

    pub(crate) fn into_parts(self) -> (Method, String, Option<Value>, CallOptions) {
        (self.method, self.path, self.payload, self.options)
    }
}

/// Parse and check a base URI: it must carry a scheme and an authority.
pub(crate) fn parse_base(uri: &str) -> Result<Uri, GatewayError> {
    let parsed: Uri = uri
        .parse()
        .map_err(|e| GatewayError::InvalidUrl(format!("{uri}: {e}")))?;
    if parsed.scheme().is_none() || parsed.authority().is_none() {
        return Err(GatewayError::InvalidUrl(format!(
            "{uri}: expected an absolute URL"
        )));
    }
    Ok(parsed)
}

/// Join `path` with `base`.
///
/// Absolute URLs are returned as is. A path starting with `/` replaces the
/// base path; any other path is resolved against the base path's directory.
/// A query string on `path` is kept.
pub(crate) fn resolve_url(base: &Uri, path: &str) -> Result<Uri, GatewayError> {
    if path.contains("://") {
        return parse_base(path);
    }

    let (path_part, query) = match path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path, None),
    };
    let joined = if path_part.starts_with('/') {
        path_part.to_owned()
    } else if path_part.is_empty() {
        base.path().to_owned()
    } else {
        let base_path = base.path();
        let dir = base_path.rfind('/').map_or("/", |idx| &base_path[..=idx]);
        format!("{dir}{path_part}")
    };
    let path_and_query = match query {
        Some(q) => format!("{joined}?{q}"),
        None => joined,
    };

    with_path_and_query(base, &path_and_query)
}

/// Append an encoded query string, keeping any query already present.
pub(crate) fn append_query(uri: Uri, query: &str) -> Result<Uri, GatewayError> {
    if query.is_empty() {
        return Ok(uri);
    }
    let path_and_query = match uri.query() {
        Some(existing) if !existing.is_empty() => format!("{}?{existing}&{query}", uri.path()),
        _ => format!("{}?{query}", uri.path()),
    };
    with_path_and_query(&uri, &path_and_query)
}

fn with_path_and_query(uri: &Uri, path_and_query: &str) -> Result<Uri, GatewayError> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query)
            .map_err(|e| GatewayError::InvalidUrl(format!("{path_and_query}: {e}")))?,
    );
    Uri::from_parts(parts).map_err(|e| GatewayError::InvalidUrl(e.to_string()))
}
