//! Error types used throughout the transport

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure categories.
///
/// Each category maps to a stable numeric code that is embedded in the
/// rendered error message, so callers parsing logs get a fixed vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestErrorKind {
    /// The request could not be assembled (bad URL, invalid header).
    Builder,
    /// Connecting to the remote host failed.
    Connect,
    /// The request or connect timeout elapsed.
    Timeout,
    /// Sending the body or reading the response body failed.
    Body,
    /// Redirect policy rejected the response.
    Redirect,
    /// Anything the HTTP client could not classify.
    Other,
}

impl RequestErrorKind {
    /// Stable numeric code for this category.
    pub const fn code(self) -> u16 {
        match self {
            Self::Builder => 1,
            Self::Connect => 2,
            Self::Timeout => 3,
            Self::Body => 4,
            Self::Redirect => 5,
            Self::Other => 99,
        }
    }
}

/// Main error type for Fluxline
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum FluxlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Request error: ({}) {message}", .kind.code())]
    Request { kind: RequestErrorKind, message: String },

    #[error("Request failed: ({status}) {reason}")]
    Status { status: u16, reason: String },

    #[error("Write queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    #[error("Worker error: {0}")]
    Worker(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FluxlineError {
    /// True for failures reported by the HTTP round trip itself.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Request { .. } | Self::Status { .. })
    }

    /// HTTP status code, when the server answered with a non-success status.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convert a `FluxlineError` into a stable label suitable for logging.
#[inline]
pub const fn error_label(error: &FluxlineError) -> &'static str {
    match error {
        FluxlineError::Config(_) => "config",
        FluxlineError::Request { .. } => "request",
        FluxlineError::Status { .. } => "status",
        FluxlineError::QueueFull { .. } => "queue_full",
        FluxlineError::Worker(_) => "worker",
        FluxlineError::Unsupported(_) => "unsupported",
        FluxlineError::Internal(_) => "internal",
    }
}

/// Result type alias for Fluxline operations
pub type Result<T> = std::result::Result<T, FluxlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_renders_code_and_reason() {
        let err = FluxlineError::Status { status: 500, reason: "Internal Server Error".into() };
        assert_eq!(err.to_string(), "Request failed: (500) Internal Server Error");
        assert_eq!(err.status(), Some(500));
        assert!(err.is_transport());
    }

    #[test]
    fn request_error_renders_kind_code() {
        let err = FluxlineError::Request {
            kind: RequestErrorKind::Timeout,
            message: "operation timed out".into(),
        };
        assert_eq!(err.to_string(), "Request error: (3) operation timed out");
        assert_eq!(err.status(), None);
        assert!(err.is_transport());
    }

    #[test]
    fn non_transport_errors_are_not_transport() {
        assert!(!FluxlineError::Config("x".into()).is_transport());
        assert!(!FluxlineError::QueueFull { capacity: 4 }.is_transport());
        assert!(!FluxlineError::Worker("x".into()).is_transport());
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(error_label(&FluxlineError::Config("x".into())), "config");
        assert_eq!(error_label(&FluxlineError::QueueFull { capacity: 1 }), "queue_full");
        assert_eq!(
            error_label(&FluxlineError::Status { status: 404, reason: "Not Found".into() }),
            "status"
        );
    }

    #[test]
    fn errors_serialize_with_type_tag() {
        let err = FluxlineError::Status { status: 503, reason: "Service Unavailable".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["type"], "Status");
        assert_eq!(json["message"]["status"], 503);

        let back: FluxlineError = serde_json::from_value(json).unwrap();
        assert_eq!(back, err);
    }
}
