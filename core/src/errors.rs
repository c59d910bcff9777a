use std::collections::BTreeMap;
use std::time::Duration;

use thiserror::Error;

/// Field name to the messages the server attached to it (422 payloads).
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors surfaced by the tourism API pipeline
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response was received at all
    #[error("Network Error: {0}")]
    Network(String),

    /// No response was received within the request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP 401. The only kind the response interceptor acts on.
    #[error("Unauthorized: {message}")]
    Auth { message: String },

    /// HTTP 422 with per-field messages
    #[error("Validation Error: {message}")]
    Validation {
        message: String,
        field_errors: FieldErrors,
    },

    #[error("Not Found: {message}")]
    NotFound { message: String },

    /// HTTP 5xx
    #[error("Server Error: {status} - {message}")]
    Server { status: u16, message: String },

    /// Any 4xx not covered above
    #[error("HTTP Error: {status} - {message}")]
    Http { status: u16, message: String },

    /// A 2xx response whose envelope carried `success: false`
    #[error("Request rejected: {message}")]
    Rejected { message: String },

    #[error("Parsing Error: {0}")]
    Parsing(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// Map a failed HTTP status and server message onto the taxonomy.
    pub fn from_status(status: u16, message: String, field_errors: FieldErrors) -> Self {
        match status {
            401 => ApiError::Auth { message },
            404 => ApiError::NotFound { message },
            422 => ApiError::Validation {
                message,
                field_errors,
            },
            500..=599 => ApiError::Server { status, message },
            200..=299 => ApiError::Rejected { message },
            _ => ApiError::Http { status, message },
        }
    }

    /// HTTP status behind this error, if a response was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Auth { .. } => Some(401),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { .. } => Some(422),
            ApiError::Server { status, .. } | ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth { .. })
    }

    /// True when no response was received, including timeouts.
    pub fn is_network(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::Timeout(_))
    }

    /// The server-supplied message, or the display form for transport errors.
    pub fn message(&self) -> String {
        match self {
            ApiError::Auth { message }
            | ApiError::Validation { message, .. }
            | ApiError::NotFound { message }
            | ApiError::Server { message, .. }
            | ApiError::Http { message, .. }
            | ApiError::Rejected { message } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Parsing(e.to_string())
    }
}

/// Result type for tourism API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(ApiError::from_status(401, "nope".into(), FieldErrors::new()).is_auth());
        assert!(matches!(
            ApiError::from_status(404, "missing".into(), FieldErrors::new()),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            ApiError::from_status(503, "down".into(), FieldErrors::new()),
            ApiError::Server { status: 503, .. }
        ));
        assert!(matches!(
            ApiError::from_status(403, "forbidden".into(), FieldErrors::new()),
            ApiError::Http { status: 403, .. }
        ));
        assert!(matches!(
            ApiError::from_status(200, "Invalid credentials".into(), FieldErrors::new()),
            ApiError::Rejected { .. }
        ));
    }

    #[test]
    fn test_validation_keeps_field_errors() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), vec!["The email field is required.".into()]);

        match ApiError::from_status(422, "The given data was invalid.".into(), fields) {
            ApiError::Validation { field_errors, .. } => {
                assert_eq!(field_errors["email"], vec!["The email field is required."]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_timeout_counts_as_network() {
        let err = ApiError::Timeout(Duration::from_secs(10));
        assert!(err.is_network());
        assert!(!err.is_auth());
        assert_eq!(err.status_code(), None);
    }

    #[test]
    fn test_message_prefers_server_text() {
        let err = ApiError::Rejected {
            message: "Invalid credentials".into(),
        };
        assert_eq!(err.message(), "Invalid credentials");
    }
}
