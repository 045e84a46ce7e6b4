//! Gateway implementation.
//!
//! This module provides the main [`Gateway`] type for talking to an instance.

use std::sync::{Arc, PoisonError, RwLock};

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method};
use masto_gateway_core::{KeyCase, Versioned, parse_version};
use rustls::ClientConfig;
use semver::Version;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tower::ServiceExt;

#[cfg(feature = "tracing")]
use tracing::Instrument;

use crate::builder::{GatewayBuilder, LoginParams};
use crate::config::GatewayConfig;
use crate::paginate::Paginator;
use crate::request::encoder::{APPLICATION_JSON, encode_body, encode_query};
use crate::request::{RequestDescriptor, append_query, parse_base, resolve_url};
use crate::response::error_parser::parse_error_response;
use crate::response::{GatewayResponse, Metadata, parse_body};
use crate::streaming::{EventStream, stream_target};
use crate::transport::{HyperTransport, Transport, TransportBody};
use crate::{CallOptions, GatewayError};

/// Path of the instance description fetched by [`Gateway::login`].
pub const INSTANCE_PATH: &str = "/api/v1/instance";

/// Client for a Mastodon-compatible instance.
///
/// The gateway is generic over `S`, the [`Transport`] it dispatches through.
/// This defaults to [`HyperTransport`].
///
/// Clones share configuration and transport. Setters take `&self`; each
/// request snapshots the configuration when it starts.
///
/// # Example
///
/// ```ignore
/// use masto_gateway::Gateway;
/// use serde_json::{json, Value};
///
/// let gateway = Gateway::builder("https://mastodon.social")
///     .access_token("token")
///     .build()?;
///
/// let status = gateway
///     .post::<Value, _>("/api/v1/statuses", &json!({"status": "hello"}))
///     .await?;
/// ```
#[derive(Clone)]
pub struct Gateway<S = HyperTransport> {
    transport: S,
    config: Arc<RwLock<GatewayConfig>>,
    tls: Option<Arc<ClientConfig>>,
}

impl<S> std::fmt::Debug for Gateway<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let config = self.config();
        f.debug_struct("Gateway")
            .field("base_uri", &config.base_uri)
            .field("streaming_uri", &config.streaming_uri)
            .field("remote_version", &config.remote_version)
            .finish_non_exhaustive()
    }
}

impl Gateway<HyperTransport> {
    /// Create a new [`GatewayBuilder`] for the instance at `base_uri`.
    pub fn builder<U: Into<String>>(base_uri: U) -> GatewayBuilder {
        GatewayBuilder::new(base_uri)
    }

    /// Build a gateway and discover the instance's version and streaming URI.
    pub async fn login(params: LoginParams) -> Result<Self, GatewayError> {
        let gateway = GatewayBuilder::from(params).build()?;
        gateway.fetch_instance().await?;
        Ok(gateway)
    }
}

impl<S> Gateway<S> {
    pub(crate) fn new(
        transport: S,
        config: Arc<RwLock<GatewayConfig>>,
        tls: Option<Arc<ClientConfig>>,
    ) -> Self {
        Self {
            transport,
            config,
            tls,
        }
    }

    /// Snapshot the current configuration.
    pub fn config(&self) -> GatewayConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn update<F: FnOnce(&mut GatewayConfig)>(&self, f: F) {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut config);
    }

    /// Replace the base URI.
    pub fn set_base_uri(&self, uri: &str) -> Result<(), GatewayError> {
        let uri = parse_base(uri)?;
        self.update(|config| config.base_uri = uri);
        Ok(())
    }

    /// Replace the streaming URI.
    pub fn set_streaming_uri(&self, uri: &str) -> Result<(), GatewayError> {
        let uri = parse_base(uri)?;
        self.update(|config| config.streaming_uri = uri);
        Ok(())
    }

    /// Replace or clear the bearer token.
    pub fn set_access_token(&self, token: Option<String>) {
        self.update(|config| config.access_token = token);
    }

    /// Replace or clear the remote version.
    pub fn set_version(&self, version: Option<&str>) -> Result<(), GatewayError> {
        let version = version.map(parse_version).transpose()?;
        self.update(|config| config.remote_version = version);
        Ok(())
    }

    /// Replace the default call options.
    pub fn set_default_options(&self, options: CallOptions) {
        self.update(|config| config.default_options = options);
    }

    pub(crate) fn tls(&self) -> Option<Arc<ClientConfig>> {
        self.tls.clone()
    }
}

impl<S> Versioned for Gateway<S> {
    fn remote_version(&self) -> Option<Version> {
        self.config().remote_version
    }
}

impl<S: Transport> Gateway<S> {
    /// Send one request through the pipeline.
    ///
    /// Outgoing payload keys are rewritten to snake case. GET payloads become
    /// query parameters; other verbs encode the payload as the body according
    /// to the declared content type. Successful responses are parsed, their
    /// keys rewritten to the configured [`KeyCase`], and returned with the
    /// untouched response headers.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Api`] for statuses in the error taxonomy
    /// - [`GatewayError::Http`] for any other failed status
    /// - [`GatewayError::Timeout`] if the exchange exceeds the call's timeout
    /// - transport errors as produced by the transport
    ///
    /// Redirects are not followed. A 3xx response is returned as
    /// [`GatewayError::Http`] with its headers, so the caller can read
    /// `Location` and decide.
    pub async fn send(&self, request: RequestDescriptor) -> Result<GatewayResponse<Value>, GatewayError> {
        let config = self.config();
        let response_case = config.key_case;
        self.dispatch(config, request, response_case).await
    }

    async fn dispatch(
        &self,
        config: GatewayConfig,
        request: RequestDescriptor,
        response_case: KeyCase,
    ) -> Result<GatewayResponse<Value>, GatewayError> {
        let (method, path, payload, options) = request.into_parts();

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "gateway.request",
            http.method = %method,
            url.path = %path,
            otel.kind = "client",
        );

        let exchange = async move {
            let options = options.merged_over(&config.default_options);
            let payload = payload.map(|p| config.outgoing_case().transform(p));
            let request = compose_request(&config, method, &path, payload.as_ref(), &options)?;

            let call = self.transport.clone().oneshot(request);
            let response = match options.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| GatewayError::Timeout)??,
                None => call.await?,
            };

            let (parts, body) = response.into_parts();
            if !parts.status.is_success() {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = %parts.status, "request failed");
                return Err(parse_error_response(parts.status, parts.headers, body));
            }

            let value = response_case.transform(parse_body(&body));
            Ok::<_, GatewayError>(GatewayResponse::new(value, Metadata::new(parts.headers)))
        };

        #[cfg(feature = "tracing")]
        let exchange = exchange.instrument(span);

        exchange.await
    }

    async fn call<T, P>(
        &self,
        method: Method,
        path: &str,
        payload: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let request = RequestDescriptor::new(method, path)
            .maybe_payload(to_payload(payload)?)
            .options(options);
        self.send(request).await?.try_map(from_payload)
    }

    /// GET `path` with `params` as query parameters.
    ///
    /// Pass `&()` for no parameters.
    pub async fn get<T, P>(&self, path: &str, params: &P) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::GET, path, params, CallOptions::default()).await
    }

    /// GET with per-call options.
    pub async fn get_with_options<T, P>(
        &self,
        path: &str,
        params: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::GET, path, params, options).await
    }

    /// POST `payload` to `path`.
    pub async fn post<T, P>(&self, path: &str, payload: &P) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::POST, path, payload, CallOptions::default()).await
    }

    /// POST with per-call options.
    pub async fn post_with_options<T, P>(
        &self,
        path: &str,
        payload: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::POST, path, payload, options).await
    }

    /// PUT `payload` to `path`.
    pub async fn put<T, P>(&self, path: &str, payload: &P) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::PUT, path, payload, CallOptions::default()).await
    }

    /// PUT with per-call options.
    pub async fn put_with_options<T, P>(
        &self,
        path: &str,
        payload: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::PUT, path, payload, options).await
    }

    /// PATCH `path` with `payload`.
    pub async fn patch<T, P>(&self, path: &str, payload: &P) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::PATCH, path, payload, CallOptions::default()).await
    }

    /// PATCH with per-call options.
    pub async fn patch_with_options<T, P>(
        &self,
        path: &str,
        payload: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::PATCH, path, payload, options).await
    }

    /// DELETE `path`, optionally with a body.
    pub async fn delete<T, P>(&self, path: &str, payload: &P) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::DELETE, path, payload, CallOptions::default()).await
    }

    /// DELETE with per-call options.
    pub async fn delete_with_options<T, P>(
        &self,
        path: &str,
        payload: &P,
        options: CallOptions,
    ) -> Result<GatewayResponse<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.call(Method::DELETE, path, payload, options).await
    }

    /// Fetch `/api/v1/instance` and record the advertised version and
    /// streaming URI.
    ///
    /// Returns the instance description with wire-convention keys. A version
    /// string that cannot be parsed leaves the recorded version unknown.
    pub async fn fetch_instance(&self) -> Result<Value, GatewayError> {
        let response = self
            .dispatch(self.config(), RequestDescriptor::get(INSTANCE_PATH), KeyCase::Preserve)
            .await?;
        let instance = response.into_inner();

        let version = instance
            .get("version")
            .and_then(Value::as_str)
            .and_then(|raw| parse_version(raw).ok());
        let streaming = instance
            .pointer("/urls/streaming_api")
            .and_then(Value::as_str)
            .map(parse_base)
            .transpose()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(version = ?version, streaming = ?streaming, "instance discovered");

        self.update(|config| {
            config.remote_version = version;
            if let Some(uri) = streaming {
                config.streaming_uri = uri;
            }
        });
        Ok(instance)
    }

    /// Create a cursor over a link-paginated collection.
    ///
    /// No request is made until the first [`Paginator::advance`].
    pub fn paginate<T, P>(&self, path: &str, params: &P) -> Result<Paginator<T, S>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.paginate_with_options(path, params, CallOptions::default())
    }

    /// Create a cursor whose every page request uses `options`.
    pub fn paginate_with_options<T, P>(
        &self,
        path: &str,
        params: &P,
        options: CallOptions,
    ) -> Result<Paginator<T, S>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        Ok(Paginator::new(self.clone(), path.to_owned(), to_payload(params)?, options))
    }

    /// Open an event stream on `path` of the streaming API.
    ///
    /// `params` are sent as query parameters; pass `&()` for none.
    pub async fn stream<T, P>(&self, path: &str, params: &P) -> Result<EventStream<T>, GatewayError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let config = self.config();
        let target = stream_target(&config, path, to_payload(params)?)?;
        EventStream::connect(target, config.key_case, self.tls()).await
    }
}

/// Build the HTTP request for one exchange.
fn compose_request(
    config: &GatewayConfig,
    method: Method,
    path: &str,
    payload: Option<&Value>,
    options: &CallOptions,
) -> Result<http::Request<TransportBody>, GatewayError> {
    let mut url = resolve_url(&config.base_uri, path)?;

    let mut base = HeaderMap::new();
    if let Some(token) = &config.access_token {
        let mut value = HeaderValue::try_from(format!("Bearer {token}"))
            .map_err(|e| GatewayError::Encode(format!("invalid access token: {e}")))?;
        value.set_sensitive(true);
        base.insert(AUTHORIZATION, value);
    }
    base.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    let mut headers = options
        .merged_over(&CallOptions::new().headers(base))
        .headers;

    let body = match payload {
        Some(params) if method == Method::GET => {
            url = append_query(url, &encode_query(params)?)?;
            TransportBody::empty()
        }
        Some(payload) => {
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or(APPLICATION_JSON);
            let encoded = encode_body(payload, content_type)?;
            if let Some(content_type) = encoded.content_type {
                headers.insert(CONTENT_TYPE, content_type);
            }
            TransportBody::full(encoded.data)
        }
        None => TransportBody::empty(),
    };

    let mut request = http::Request::builder()
        .method(method)
        .uri(url)
        .body(body)
        .map_err(|e| GatewayError::Encode(format!("failed to build request: {e}")))?;
    *request.headers_mut() = headers;
    Ok(request)
}

/// Serialize a caller payload. `null` (e.g. from `&()`) means no payload.
pub(crate) fn to_payload<P: Serialize + ?Sized>(payload: &P) -> Result<Option<Value>, GatewayError> {
    match serde_json::to_value(payload).map_err(|e| GatewayError::Encode(e.to_string()))? {
        Value::Null => Ok(None),
        value => Ok(Some(value)),
    }
}

pub(crate) fn from_payload<T: DeserializeOwned>(value: Value) -> Result<T, GatewayError> {
    serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
}
