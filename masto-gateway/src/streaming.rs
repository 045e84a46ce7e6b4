//! Event streams over the streaming API.
//!
//! This module provides [`EventStream`], a typed stream of events read from
//! a WebSocket connection to the instance's streaming endpoint.
//!
//! # Authentication
//!
//! Servers from 2.8.4 on accept the access token as the WebSocket
//! sub-protocol. Older or unknown versions get it as the `access_token`
//! query parameter.
//!
//! # Cancellation
//!
//! Dropping an [`EventStream`] drops the connection. Use
//! [`EventStream::close`] to send a close frame first.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use futures::Stream;
use http::header::SEC_WEBSOCKET_PROTOCOL;
use http::{HeaderValue, Uri};
use masto_gateway_core::KeyCase;
use rustls::ClientConfig;
use semver::Version;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream, connect_async_tls_with_config};

use crate::GatewayError;
use crate::client::from_payload;
use crate::config::GatewayConfig;
use crate::request::encoder::encode_query;
use crate::request::{append_query, resolve_url};

/// First server version accepting the token as a WebSocket sub-protocol.
pub const SUBPROTOCOL_TOKEN_SINCE: Version = Version::new(2, 8, 4);

const ACCESS_TOKEN_PARAM: &str = "access_token";

/// Where and how to open a stream.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StreamTarget {
    pub(crate) uri: Uri,
    pub(crate) protocols: Vec<String>,
}

/// Resolve the stream URL and place the access token.
pub(crate) fn stream_target(
    config: &GatewayConfig,
    path: &str,
    params: Option<Value>,
) -> Result<StreamTarget, GatewayError> {
    let uri = resolve_url(&config.streaming_uri, path)?;
    let mut params = params.map(|p| config.outgoing_case().transform(p));
    let mut protocols = Vec::new();

    if let Some(token) = &config.access_token {
        let subprotocol = config
            .remote_version
            .as_ref()
            .is_some_and(|version| *version >= SUBPROTOCOL_TOKEN_SINCE);
        if subprotocol {
            protocols.push(token.clone());
        } else {
            match params.get_or_insert_with(|| Value::Object(Map::new())) {
                Value::Object(map) => {
                    map.insert(ACCESS_TOKEN_PARAM.to_owned(), Value::String(token.clone()));
                }
                _ => {
                    return Err(GatewayError::Encode(
                        "stream parameters must be an object".into(),
                    ));
                }
            }
        }
    }

    let uri = match &params {
        Some(params) => append_query(uri, &encode_query(params)?)?,
        None => uri,
    };
    Ok(StreamTarget { uri, protocols })
}

/// Parse one text frame into an event.
pub(crate) fn decode_event<T: DeserializeOwned>(text: &str, key_case: KeyCase) -> Result<T, GatewayError> {
    let value: Value = serde_json::from_str(text).map_err(|e| GatewayError::Decode(e.to_string()))?;
    from_payload(key_case.transform(value))
}

pin_project_lite::pin_project! {
    /// A stream of events of type `T` from the streaming API.
    ///
    /// Created by [`Gateway::stream`](crate::Gateway::stream). Text frames
    /// are parsed as JSON, have their keys rewritten to the gateway's
    /// [`KeyCase`] and are decoded into `T`. Other frames are skipped. The
    /// stream ends when the server closes the connection.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use futures::StreamExt;
    ///
    /// let mut events = gateway.stream::<Event, _>("/api/v1/streaming", &json!({"stream": "user"})).await?;
    /// while let Some(event) = events.next().await {
    ///     println!("{:?}", event?);
    /// }
    /// ```
    pub struct EventStream<T> {
        #[pin]
        socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
        key_case: KeyCase,
        done: bool,
        _event: PhantomData<fn() -> T>,
    }
}

impl<T> EventStream<T> {
    /// Open a connection to `target`.
    ///
    /// `tls` is used for `wss` URLs; without it the WebSocket library's
    /// default roots apply.
    pub(crate) async fn connect(
        target: StreamTarget,
        key_case: KeyCase,
        tls: Option<Arc<ClientConfig>>,
    ) -> Result<Self, GatewayError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(path = target.uri.path(), subprotocol = !target.protocols.is_empty(), "opening stream");

        let mut request = target.uri.into_client_request()?;
        if !target.protocols.is_empty() {
            let mut value = HeaderValue::try_from(target.protocols.join(", "))
                .map_err(|e| GatewayError::Encode(format!("invalid access token: {e}")))?;
            value.set_sensitive(true);
            request.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, value);
        }

        let (socket, _) = connect_async_tls_with_config(request, None, false, tls.map(Connector::Rustls)).await?;

        Ok(Self {
            socket,
            key_case,
            done: false,
            _event: PhantomData,
        })
    }

    /// Send a close frame and wait for the connection to shut down.
    pub async fn close(mut self) -> Result<(), GatewayError> {
        match self.socket.close(None).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("key_case", &self.key_case)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned> Stream for EventStream<T> {
    type Item = Result<T, GatewayError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        if *this.done {
            return Poll::Ready(None);
        }
        loop {
            match ready!(this.socket.as_mut().poll_next(cx)) {
                Some(Ok(Message::Text(text))) => {
                    return Poll::Ready(Some(decode_event(text.as_str(), *this.key_case)));
                }
                Some(Ok(Message::Close(_))) | None => {
                    *this.done = true;
                    return Poll::Ready(None);
                }
                Some(Ok(_)) => continue,
                Some(Err(err)) => {
                    *this.done = true;
                    return Poll::Ready(Some(Err(err.into())));
                }
            }
        }
    }
}
