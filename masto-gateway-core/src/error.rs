//! Error kinds reported by the remote API.
//!
//! This module provides the error taxonomy shared by the client:
//! - [`ErrorKind`]: The closed set of error kinds
//! - [`ApiError`]: A classified error carrying the server message
//! - [`ErrorBody`]: The JSON error payload sent by the server

use std::str::FromStr;

use http::StatusCode;
use serde::{Deserialize, Serialize};

/// Message used when the server did not say what went wrong.
pub const DEFAULT_ERROR_MESSAGE: &str = "Unexpected error occurred";

/// Kinds of errors the remote API reports through HTTP status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Gone,
    UnprocessableEntity,
    RateLimited,
    Unknown,
}

impl ErrorKind {
    /// Classify an HTTP status code.
    ///
    /// Returns `None` for statuses outside the taxonomy. Callers are expected
    /// to pass such responses through untouched instead of mapping them to
    /// [`ErrorKind::Unknown`].
    ///
    /// # Example
    ///
    /// ```
    /// use http::StatusCode;
    /// use masto_gateway_core::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::from_status(StatusCode::NOT_FOUND), Some(ErrorKind::NotFound));
    /// assert_eq!(ErrorKind::from_status(StatusCode::IM_A_TEAPOT), None);
    /// ```
    pub fn from_status(status: StatusCode) -> Option<Self> {
        match status.as_u16() {
            401 => Some(ErrorKind::Unauthorized),
            403 => Some(ErrorKind::Forbidden),
            404 => Some(ErrorKind::NotFound),
            409 => Some(ErrorKind::Conflict),
            410 => Some(ErrorKind::Gone),
            422 => Some(ErrorKind::UnprocessableEntity),
            429 => Some(ErrorKind::RateLimited),
            _ => None,
        }
    }

    /// The status code this kind is classified from, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ErrorKind::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ErrorKind::Forbidden => Some(StatusCode::FORBIDDEN),
            ErrorKind::NotFound => Some(StatusCode::NOT_FOUND),
            ErrorKind::Conflict => Some(StatusCode::CONFLICT),
            ErrorKind::Gone => Some(StatusCode::GONE),
            ErrorKind::UnprocessableEntity => Some(StatusCode::UNPROCESSABLE_ENTITY),
            ErrorKind::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS),
            ErrorKind::Unknown => None,
        }
    }

    /// Get the string representation of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Gone => "gone",
            ErrorKind::UnprocessableEntity => "unprocessable_entity",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an [`ErrorKind`] from a string fails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseErrorKindError(());

impl std::fmt::Display for ParseErrorKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown error kind")
    }
}

impl std::error::Error for ParseErrorKindError {}

impl FromStr for ErrorKind {
    type Err = ParseErrorKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unauthorized" => Ok(ErrorKind::Unauthorized),
            "forbidden" => Ok(ErrorKind::Forbidden),
            "not_found" => Ok(ErrorKind::NotFound),
            "conflict" => Ok(ErrorKind::Conflict),
            "gone" => Ok(ErrorKind::Gone),
            "unprocessable_entity" => Ok(ErrorKind::UnprocessableEntity),
            "rate_limited" => Ok(ErrorKind::RateLimited),
            "unknown" => Ok(ErrorKind::Unknown),
            _ => Err(ParseErrorKindError(())),
        }
    }
}

/// A classified API error.
///
/// Carries the server-supplied message unchanged. `status` is `None` when the
/// error was produced locally, e.g. by a version gate rejection, which reuses
/// [`ErrorKind::NotFound`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<StatusCode>,
    message: String,
}

impl ApiError {
    /// Create an error with a kind and message, without a status code.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Classify a server response.
    ///
    /// Returns `None` when the status is outside the taxonomy.
    pub fn classify<S: Into<String>>(status: StatusCode, message: S) -> Option<Self> {
        ErrorKind::from_status(status).map(|kind| Self {
            kind,
            status: Some(status),
            message: message.into(),
        })
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the originating status code, if the error came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Get the server message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a not found error.
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}

/// JSON body of an error response.
///
/// ```json
/// {"error": "Record not found"}
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    /// Parse an error body, tolerating bodies that are not JSON at all.
    pub fn parse(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap_or_default()
    }

    /// The human readable message, or [`DEFAULT_ERROR_MESSAGE`].
    pub fn message(&self) -> &str {
        self.error.as_deref().unwrap_or(DEFAULT_ERROR_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_taxonomy() {
        let cases = [
            (401, ErrorKind::Unauthorized),
            (403, ErrorKind::Forbidden),
            (404, ErrorKind::NotFound),
            (409, ErrorKind::Conflict),
            (410, ErrorKind::Gone),
            (422, ErrorKind::UnprocessableEntity),
            (429, ErrorKind::RateLimited),
        ];
        for (code, kind) in cases {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), Some(kind));
            assert_eq!(kind.status(), Some(status));
        }
    }

    #[test]
    fn test_from_status_unmapped() {
        for code in [400, 418, 500, 502, 503] {
            let status = StatusCode::from_u16(code).unwrap();
            assert_eq!(ErrorKind::from_status(status), None);
        }
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in [
            ErrorKind::Unauthorized,
            ErrorKind::Forbidden,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Gone,
            ErrorKind::UnprocessableEntity,
            ErrorKind::RateLimited,
            ErrorKind::Unknown,
        ] {
            assert_eq!(kind.as_str().parse::<ErrorKind>(), Ok(kind));
        }
        assert!("teapot".parse::<ErrorKind>().is_err());
    }

    #[test]
    fn test_classify_keeps_message() {
        let err = ApiError::classify(StatusCode::TOO_MANY_REQUESTS, "RateLimit").unwrap();
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert_eq!(err.message(), "RateLimit");
        assert_eq!(err.to_string(), "rate_limited: RateLimit");

        assert!(ApiError::classify(StatusCode::IM_A_TEAPOT, "teapot").is_none());
    }

    #[test]
    fn test_error_body_message() {
        let body = ErrorBody::parse(br#"{"error":"Record not found"}"#);
        assert_eq!(body.message(), "Record not found");

        let body = ErrorBody::parse(b"<html>bad gateway</html>");
        assert_eq!(body.message(), DEFAULT_ERROR_MESSAGE);

        let body = ErrorBody::parse(br#"{"other":1}"#);
        assert_eq!(body.message(), DEFAULT_ERROR_MESSAGE);
    }
}
