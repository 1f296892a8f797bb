//! Error types for the download module.
//!
//! Each variant corresponds to one class of the retrieval error taxonomy:
//! bad input, missing authorization, local file failures, transport failures
//! and service-reported failures.

use std::path::PathBuf;

use thiserror::Error;

use crate::feed::UnknownValueError;

/// Errors that can occur while retrieving a feed file.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Malformed caller or server input (dates, content-range values, directories).
    /// Never retried.
    #[error("{message}: {input}")]
    InputData {
        /// Human-readable description of what is wrong.
        message: String,
        /// The offending raw value.
        input: String,
    },

    /// No bearer token was supplied.
    #[error("{message}")]
    Authorization {
        /// Human-readable description.
        message: String,
    },

    /// The destination file could not be created, opened or written.
    #[error("IO error on file {path}: {source}")]
    FileCreation {
        /// The file that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL that failed.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout requesting {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// The configured endpoint is not a valid URL.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// The service answered with a status other than 200 or 206.
    #[error("HTTP {status}: {message}")]
    Service {
        /// The HTTP status code.
        status: u16,
        /// The `errors` payload rendered as text, or the raw body.
        message: String,
        /// The parsed `errors` field of the JSON body, when there was one.
        errors: Option<serde_json::Value>,
    },
}

impl DownloadError {
    /// Creates an input-data error.
    pub fn input_data(message: impl Into<String>, input: impl Into<String>) -> Self {
        Self::InputData {
            message: message.into(),
            input: input.into(),
        }
    }

    /// Creates an authorization error.
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    /// Creates a file-creation error.
    pub fn file_creation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileCreation {
            path: path.into(),
            source,
        }
    }

    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Builds a service error from a non-success response body.
    ///
    /// A JSON body's `errors` field becomes both the message and the
    /// structured detail; anything else is reported verbatim.
    #[must_use]
    pub fn service(status: u16, body: &[u8]) -> Self {
        let errors = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|json| json.get("errors").cloned());
        let message = match &errors {
            Some(errors) => errors.to_string(),
            None if body.is_empty() => "empty response body".to_string(),
            None => String::from_utf8_lossy(body).into_owned(),
        };
        Self::Service {
            status,
            message,
            errors,
        }
    }

    /// Structured error detail reported back to callers, if any.
    #[must_use]
    pub fn errors(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Service { errors, .. } => errors.as_ref(),
            _ => None,
        }
    }

    /// Message surfaced in a failure result.
    ///
    /// Service failures surface the service's own `errors` payload.
    #[must_use]
    pub fn result_message(&self) -> String {
        match self {
            Self::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<UnknownValueError> for DownloadError {
    fn from(err: UnknownValueError) -> Self {
        Self::input_data(format!("unknown {}", err.kind), err.value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_input_data_display_includes_raw_value() {
        let error = DownloadError::input_data("Bad content-range header format", "abc");
        let msg = error.to_string();
        assert!(msg.contains("Bad content-range"), "{msg}");
        assert!(msg.contains("abc"), "{msg}");
    }

    #[test]
    fn test_file_creation_display_includes_path() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error = DownloadError::file_creation(PathBuf::from("/tmp/feed.gz"), io_error);
        let msg = error.to_string();
        assert!(msg.contains("/tmp/feed.gz"), "Expected path in: {msg}");
    }

    #[test]
    fn test_service_error_extracts_errors_field() {
        let body = br#"{"errors":[{"errorId":13022,"message":"Invalid date"}]}"#;
        let error = DownloadError::service(400, body);
        let errors = error.errors().unwrap();
        assert_eq!(errors[0]["errorId"], 13022);
        assert!(error.result_message().contains("Invalid date"));
        assert!(error.to_string().starts_with("HTTP 400"));
    }

    #[test]
    fn test_service_error_falls_back_to_raw_body() {
        let error = DownloadError::service(502, b"<html>bad gateway</html>");
        assert!(error.errors().is_none());
        assert_eq!(error.result_message(), "<html>bad gateway</html>");

        let empty = DownloadError::service(500, b"");
        assert_eq!(empty.result_message(), "empty response body");
    }

    #[test]
    fn test_unknown_enum_value_maps_to_input_data() {
        let err: DownloadError = "WEEKLY"
            .parse::<crate::feed::FeedScope>()
            .unwrap_err()
            .into();
        assert!(matches!(err, DownloadError::InputData { ref input, .. } if input == "WEEKLY"));
    }
}
