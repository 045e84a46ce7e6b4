//! Client-side gateway error types.
//!
//! This module provides [`GatewayError`], the error type for every gateway operation.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use masto_gateway_core::{ApiError, ErrorKind, VersionError};
use tokio_tungstenite::tungstenite;

/// Errors produced by the gateway.
///
/// Classified server errors arrive as [`GatewayError::Api`]. A response whose
/// status falls outside the taxonomy is handed back untouched as
/// [`GatewayError::Http`]. Failures below HTTP are passed through as the
/// transport reported them.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A classified error, from the server or from a version gate.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A failed response whose status has no [`ErrorKind`].
    #[error("unexpected response status {status}")]
    Http {
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
    },

    /// Transport-level error (connection failed, TLS, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The exchange did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// WebSocket handshake or protocol error.
    #[error("websocket error: {0}")]
    WebSocket(Box<tungstenite::Error>),

    /// Payload encoding error.
    #[error("encode error: {0}")]
    Encode(String),

    /// Payload decoding error.
    #[error("decode error: {0}")]
    Decode(String),

    /// A URL could not be parsed or joined.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A version string or range could not be parsed.
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    /// Missing or malformed configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Get the error kind.
    ///
    /// Everything that is not a classified API error maps to
    /// [`ErrorKind::Unknown`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Api(err) => err.kind(),
            _ => ErrorKind::Unknown,
        }
    }

    /// Get the response status, if the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            GatewayError::Api(err) => err.status(),
            GatewayError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Get the classified error, if any.
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            GatewayError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the exchange timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout)
    }
}

impl From<tungstenite::Error> for GatewayError {
    fn from(err: tungstenite::Error) -> Self {
        GatewayError::WebSocket(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_of_api_error() {
        let err: GatewayError = ApiError::classify(StatusCode::GONE, "Gone").unwrap().into();
        assert_eq!(err.kind(), ErrorKind::Gone);
        assert_eq!(err.status(), Some(StatusCode::GONE));
        assert_eq!(err.to_string(), "gone: Gone");
    }

    #[test]
    fn test_unclassified_variants_are_unknown() {
        let http = GatewayError::Http {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers: HeaderMap::new(),
            body: Bytes::from_static(b"down"),
        };
        assert_eq!(http.kind(), ErrorKind::Unknown);
        assert_eq!(http.status(), Some(StatusCode::SERVICE_UNAVAILABLE));

        for err in [
            GatewayError::Transport("connection refused".into()),
            GatewayError::Timeout,
            GatewayError::Encode("bad".into()),
            GatewayError::Decode("bad".into()),
            GatewayError::InvalidUrl("::".into()),
        ] {
            assert_eq!(err.kind(), ErrorKind::Unknown);
            assert!(err.status().is_none());
            assert!(err.as_api().is_none());
        }
    }

    #[test]
    fn test_version_gate_error_has_no_status() {
        let err: GatewayError = ApiError::not_found("removed").into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.status().is_none());
    }

    #[test]
    fn test_websocket_error_is_boxed() {
        let err: GatewayError = tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, GatewayError::WebSocket(_)));
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
