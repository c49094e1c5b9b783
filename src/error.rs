//! Error types for the API client and query cache.

use std::fmt;

/// Result type for client and cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the BARcode client.
///
/// Every query and mutation returns `Result<T>`. `Error` is `Clone` because a
/// single shared fetch delivers its outcome to every subscriber of the key.
#[derive(Debug, Clone)]
pub enum Error {
    /// The API answered 401.
    ///
    /// The configured `AuthHandler` has already been told to send the user
    /// to the login page. Terminal: never retried and never stored in a
    /// query entry.
    Unauthenticated {
        /// Login page the handler was pointed at.
        redirect: String,
    },

    /// The API answered 403 (supporting membership required).
    ///
    /// Same handling as [`Error::Unauthenticated`], with the upgrade page.
    Forbidden {
        /// Membership upgrade page the handler was pointed at.
        redirect: String,
    },

    /// Request rejected with a 4xx carrying field detail.
    ///
    /// Surfaced to the submitting form; resubmitting the same input is allowed.
    Validation {
        /// HTTP status returned by the API.
        status: u16,
        /// Response body, usually the field message.
        message: String,
    },

    /// Resource does not exist (404, or a lookup that found nothing).
    ///
    /// Views render an empty state for this rather than an error banner.
    NotFound(String),

    /// The API failed with a 5xx.
    ///
    /// **Recovery:** retryable; cached data stays visible.
    Server {
        /// HTTP status returned by the API.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// Request exceeded the configured timeout.
    ///
    /// **Recovery:** retryable.
    Timeout(String),

    /// Connection-level failure (DNS, refused, reset).
    ///
    /// **Recovery:** retryable.
    Network(String),

    /// Response body did not match the expected shape.
    Deserialization(String),

    /// Invalid client configuration (bad base URL and so on).
    Config(String),

    /// A gated query was asked to fetch while `enabled` is false.
    Disabled,

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// True for failures that a bounded retry with backoff may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Server { .. } | Error::Timeout(_) | Error::Network(_)
        )
    }

    /// True for the two statuses handled globally by redirect.
    pub fn is_redirect(&self) -> bool {
        matches!(self, Error::Unauthenticated { .. } | Error::Forbidden { .. })
    }

    /// True when a view should show an empty state instead of an error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// HTTP status behind this error, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Unauthenticated { .. } => Some(401),
            Error::Forbidden { .. } => Some(403),
            Error::Validation { status, .. } | Error::Server { status, .. } => Some(*status),
            Error::NotFound(_) => Some(404),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unauthenticated { redirect } => {
                write!(f, "Not signed in, redirected to {}", redirect)
            }
            Error::Forbidden { redirect } => {
                write!(f, "Membership required, redirected to {}", redirect)
            }
            Error::Validation { status, message } => {
                write!(f, "Request rejected ({}): {}", status, message)
            }
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Server { status, message } => {
                write!(f, "Server error ({}): {}", status, message)
            }
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::Network(msg) => write!(f, "Network error: {}", msg),
            Error::Deserialization(msg) => write!(f, "Deserialization error: {}", msg),
            Error::Config(msg) => write!(f, "Config error: {}", msg),
            Error::Disabled => write!(f, "Query is disabled"),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Deserialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Other(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_decode() {
            Error::Deserialization(e.to_string())
        } else if e.is_builder() {
            Error::Config(e.to_string())
        } else {
            Error::Network(e.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Config(format!("invalid URL: {}", e))
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Validation {
            status: 422,
            message: "name is required".to_string(),
        };
        assert_eq!(err.to_string(), "Request rejected (422): name is required");
    }

    #[test]
    fn test_error_from_string() {
        let err: Error = "test error".into();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Server {
            status: 502,
            message: String::new()
        }
        .is_retryable());
        assert!(Error::Timeout("30s".into()).is_retryable());
        assert!(Error::Network("refused".into()).is_retryable());

        assert!(!Error::NotFound("frag 7".into()).is_retryable());
        assert!(!Error::Unauthenticated {
            redirect: "https://login".into()
        }
        .is_retryable());
        assert!(!Error::Validation {
            status: 400,
            message: String::new()
        }
        .is_retryable());
    }

    #[test]
    fn test_redirect_statuses() {
        let unauth = Error::Unauthenticated {
            redirect: "a".into(),
        };
        let forbidden = Error::Forbidden {
            redirect: "b".into(),
        };
        assert!(unauth.is_redirect());
        assert!(forbidden.is_redirect());
        assert_eq!(unauth.status(), Some(401));
        assert_eq!(forbidden.status(), Some(403));
        assert!(!Error::NotFound("x".into()).is_redirect());
    }
}
