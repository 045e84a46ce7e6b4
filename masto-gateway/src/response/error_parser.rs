//! Error response parsing.
//!
//! Servers report failures as `{"error": "<message>"}`. The status code picks
//! the [`ErrorKind`](masto_gateway_core::ErrorKind); the body only supplies
//! the message.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use masto_gateway_core::{ApiError, ErrorBody};

use crate::GatewayError;

/// Turn a failed response into a [`GatewayError`].
///
/// Statuses covered by the taxonomy become [`GatewayError::Api`] with the
/// server message, or the default message if the body has none. Anything
/// else is returned untouched as [`GatewayError::Http`].
pub(crate) fn parse_error_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> GatewayError {
    let message = ErrorBody::parse(&body);
    match ApiError::classify(status, message.message()) {
        Some(err) => GatewayError::Api(err),
        None => GatewayError::Http {
            status,
            headers,
            body,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use masto_gateway_core::{DEFAULT_ERROR_MESSAGE, ErrorKind};

    #[test]
    fn test_classified_with_message() {
        let err = parse_error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            HeaderMap::new(),
            Bytes::from_static(br#"{"error":"Validation failed: Text can't be blank"}"#),
        );
        let api = err.as_api().unwrap();
        assert_eq!(api.kind(), ErrorKind::UnprocessableEntity);
        assert_eq!(api.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
        assert_eq!(api.message(), "Validation failed: Text can't be blank");
    }

    #[test]
    fn test_classified_without_message() {
        let err = parse_error_response(StatusCode::UNAUTHORIZED, HeaderMap::new(), Bytes::new());
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.as_api().unwrap().message(), DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn test_unclassified_passes_through() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "30".parse().unwrap());
        let err = parse_error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            headers,
            Bytes::from_static(b"<html>maintenance</html>"),
        );
        match err {
            GatewayError::Http {
                status,
                headers,
                body,
            } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(headers["retry-after"], "30");
                assert_eq!(&body[..], b"<html>maintenance</html>");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
