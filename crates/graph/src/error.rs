//! Error types for Graph operations.
//!
//! Errors are categorized so callers can decide whether to retry and how to
//! report them. [`Error`] converts into the core [`RemoteError`] at the
//! directory boundary.

use std::fmt;
use std::io;
use std::path::PathBuf;

use assignment::{RemoteError, RemoteErrorKind};

/// Result type alias for Graph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of Graph errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Credentials missing, expired, or rejected.
    Authentication,
    /// Rate limited by the service (HTTP 429).
    Throttled,
    /// Object does not exist.
    NotFound,
    /// Conflicting object state (HTTP 409).
    Conflict,
    /// Transport failure or server error (transient).
    Network,
    /// Unexpected response body.
    Format,
    /// Local configuration problem.
    Config,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled | Self::Network)
    }

    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Authentication => "Authentication failed",
            Self::Throttled => "Request throttled",
            Self::NotFound => "Object not found",
            Self::Conflict => "Conflicting change",
            Self::Network => "Network connectivity issue",
            Self::Format => "Unexpected response",
            Self::Config => "Invalid configuration",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Authentication => {
                "Run `intune-tools login` again and check the app's Graph permissions"
            }
            Self::Throttled => "Wait a moment and retry with fewer parallel jobs",
            Self::NotFound => "Verify the group and app identifiers",
            Self::Conflict => "Refresh the existing assignments and try again",
            Self::Network => "Check your internet connection and try again",
            Self::Format => "The service returned data this tool does not understand",
            Self::Config => "Check the [auth] section of config.toml",
            Self::Other => "Check the error details for more information",
        }
    }

    fn remote_kind(self) -> RemoteErrorKind {
        match self {
            Self::Authentication => RemoteErrorKind::Authentication,
            Self::Throttled => RemoteErrorKind::Throttled,
            Self::NotFound => RemoteErrorKind::NotFound,
            Self::Conflict => RemoteErrorKind::Conflict,
            Self::Network => RemoteErrorKind::Network,
            Self::Format | Self::Config | Self::Other => RemoteErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to Graph or the identity platform.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Graph returned a non-success status.
    #[error("Graph API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Graph error code, e.g. `Request_ResourceNotFound`.
        code: Option<String>,
        /// Error message from the response body.
        message: String,
    },

    /// The request never produced a response.
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Token acquisition failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The browser sign-in did not return to the expected redirect.
    #[error("browser sign-in failed: {0}")]
    Redirect(String),

    /// The device code expired before the user signed in.
    #[error("device code expired before sign-in completed")]
    DeviceCodeExpired,

    /// The user declined the sign-in request.
    #[error("sign-in was declined")]
    Declined,

    /// Invalid response from the service.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// Credentials file missing fields or unreadable.
    #[error("invalid credentials file {}: {message}", .path.display())]
    Credentials {
        /// File that was read.
        path: PathBuf,
        /// What was wrong with it.
        message: String,
    },

    /// IO error while reading local files.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Generic error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an API error.
    pub fn api(status: u16, code: Option<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code,
            message: message.into(),
        }
    }

    /// Get the error category for retry logic.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                404 => ErrorCategory::NotFound,
                409 => ErrorCategory::Conflict,
                429 => ErrorCategory::Throttled,
                500..=599 => ErrorCategory::Network,
                _ => ErrorCategory::Other,
            },
            Error::Transport(_) => ErrorCategory::Network,
            Error::Auth(_) | Error::Redirect(_) | Error::DeviceCodeExpired | Error::Declined => {
                ErrorCategory::Authentication
            }
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Credentials { .. } => ErrorCategory::Config,
            Error::Io { .. } | Error::Other(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether a browser sign-in failed on the redirect URI, so device code
    /// sign-in is worth trying instead.
    #[must_use]
    pub fn is_redirect_failure(&self) -> bool {
        match self {
            Error::Redirect(_) => true,
            Error::Auth(message) => {
                message.contains("AADSTS50011") || message.to_lowercase().contains("redirect")
            }
            _ => false,
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::api(code, None, format!("HTTP {code}")),
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

impl From<Error> for RemoteError {
    fn from(err: Error) -> Self {
        let kind = err.category().remote_kind();
        match err {
            Error::Api { message, .. } => RemoteError::new(kind, message),
            other => RemoteError::new(kind, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_categories() {
        let cases = [
            (401, ErrorCategory::Authentication),
            (403, ErrorCategory::Authentication),
            (404, ErrorCategory::NotFound),
            (409, ErrorCategory::Conflict),
            (429, ErrorCategory::Throttled),
            (503, ErrorCategory::Network),
            (400, ErrorCategory::Other),
        ];
        for (status, category) in cases {
            assert_eq!(Error::api(status, None, "x").category(), category, "HTTP {status}");
        }
    }

    #[test]
    fn test_retryable() {
        assert!(Error::api(429, None, "slow down").is_retryable());
        assert!(Error::Transport("reset".into()).is_retryable());
        assert!(!Error::api(403, None, "forbidden").is_retryable());
        assert!(!Error::Declined.is_retryable());
    }

    #[test]
    fn test_into_remote_error_keeps_message() {
        let err = Error::api(
            409,
            Some("Conflict".into()),
            "The assignment already exists",
        );
        let remote: RemoteError = err.into();
        assert_eq!(remote.kind, RemoteErrorKind::Conflict);
        assert_eq!(remote.message, "The assignment already exists");
    }

    #[test]
    fn test_auth_maps_to_remote_authentication() {
        let remote: RemoteError = Error::Auth("invalid_grant".into()).into();
        assert!(remote.is_authentication());
    }

    #[test]
    fn test_redirect_failure_detection() {
        assert!(Error::Redirect("no code".into()).is_redirect_failure());
        assert!(
            Error::Auth("AADSTS50011: The redirect URI does not match".into())
                .is_redirect_failure()
        );
        assert!(!Error::Auth("invalid_client".into()).is_redirect_failure());
        assert!(!Error::DeviceCodeExpired.is_redirect_failure());
    }

    #[test]
    fn test_category_advice_present() {
        for category in [
            ErrorCategory::Authentication,
            ErrorCategory::Throttled,
            ErrorCategory::Network,
            ErrorCategory::Config,
        ] {
            assert!(!category.advice().is_empty());
            assert!(!category.to_string().is_empty());
        }
    }
}
