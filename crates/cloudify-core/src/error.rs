//! Error types for Cloudify manager operations.
//!
//! A single error enum is shared by every client crate. HTTP failures keep the
//! status code and response body exactly as the manager returned them.

use thiserror::Error;

/// Main error type for Cloudify client operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Caller supplied an argument the API contract forbids (empty id, unknown action)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Manager reported that the addressed resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Manager answered with a status other than the one the operation expects
    #[error("Unexpected status {status} (expected {expected}): {body}")]
    UnexpectedStatus {
        /// Status code returned by the manager
        status: u16,
        /// Status code the operation expected
        expected: u16,
        /// Raw response body
        body: String,
    },

    /// Manager could not be reached
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    /// Operation timed out
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Failed to parse a manager response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Packing a blueprint directory into an archive failed
    #[error("Blueprint packaging failed: {0}")]
    PackagingFailed(String),

    /// Local file could not be read
    #[error("I/O error: {0}")]
    Io(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Invalid endpoint
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Specialized result type for Cloudify client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::HttpError(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::ParseError(_) => "PARSE_ERROR",
            Self::PackagingFailed(_) => "PACKAGING_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
        }
    }

    /// HTTP status carried by the error, if it originated from a manager response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::ServiceUnavailable(err.to_string())
        } else if err.is_decode() {
            Self::ParseError(err.to_string())
        } else {
            Self::HttpError(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::ValidationError(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            Error::InvalidRequest("test".to_string()).error_code(),
            "INVALID_REQUEST"
        );
        assert_eq!(Error::NotFound("test".to_string()).error_code(), "NOT_FOUND");
        assert_eq!(
            Error::UnexpectedStatus {
                status: 500,
                expected: 200,
                body: "boom".to_string()
            }
            .error_code(),
            "UNEXPECTED_STATUS"
        );
        assert_eq!(
            Error::PackagingFailed("test".to_string()).error_code(),
            "PACKAGING_FAILED"
        );
        assert_eq!(Error::Timeout("test".to_string()).error_code(), "TIMEOUT");
        assert_eq!(Error::Io("test".to_string()).error_code(), "IO_ERROR");
    }

    #[test]
    fn test_unexpected_status_display_keeps_body() {
        let err = Error::UnexpectedStatus {
            status: 400,
            expected: 201,
            body: r#"{"message": "bad blueprint"}"#.to_string(),
        };
        assert_eq!(
            err.to_string(),
            r#"Unexpected status 400 (expected 201): {"message": "bad blueprint"}"#
        );
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_from_url_parse_error() {
        let err = url::Url::parse("not a url").unwrap_err();
        let converted: Error = err.into();
        assert!(matches!(converted, Error::InvalidEndpoint(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let converted: Error = err.into();
        assert!(matches!(converted, Error::ParseError(_)));
    }

    #[test]
    fn test_from_validation_errors() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("manager_url", validator::ValidationError::new("url"));
        let converted: Error = errors.into();
        assert!(matches!(converted, Error::ValidationError(_)));
    }

    #[test]
    fn test_from_io_error() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.tar");
        let converted: Error = err.into();
        assert_eq!(converted, Error::Io("missing.tar".to_string()));
    }
}
