//! Error types for planning and applying assignments.
//!
//! Local validation problems ([`PlanError::EmptySelection`], [`OptionError`])
//! are reported before any remote call is made. Per-pair failures during a
//! batch never surface here; they are captured in
//! [`BatchResult`](crate::types::BatchResult). Only authentication failures
//! stop a batch early.

use crate::types::{BatchResult, RemoteErrorKind};
use thiserror::Error;

/// Error returned by a [`RemoteDirectory`](crate::directory::RemoteDirectory) call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// Message as reported by the service
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Authentication, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Other, message)
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == RemoteErrorKind::Authentication
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Invalid assignment option or intent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("unknown assignment option '{0}' (expected notify, restart_required or override_existing)")]
    UnknownKey(String),

    #[error("invalid value '{value}' for option '{key}' (expected true or false)")]
    InvalidValue { key: String, value: String },

    #[error("malformed option '{0}' (expected key=value)")]
    Malformed(String),

    #[error("invalid intent '{0}' (expected required, available or uninstall)")]
    InvalidIntent(String),
}

/// Errors raised while building a plan
#[derive(Debug, Error)]
pub enum PlanError {
    /// Nothing to do: no groups or no apps selected
    #[error("select at least one group and one app ({groups} groups, {apps} apps selected)")]
    EmptySelection { groups: usize, apps: usize },

    /// Listing existing assignments failed; the plan would risk duplicates
    #[error("could not list existing assignments for app {app_id}: {source}")]
    DedupFetch {
        app_id: String,
        #[source]
        source: RemoteError,
    },

    /// Credentials were rejected while listing existing assignments
    #[error("authentication failed: {0}")]
    Authentication(#[source] RemoteError),
}

/// Errors that abort a batch
#[derive(Debug, Error)]
pub enum ExecuteError {
    /// Repeated authentication failures; no further call can succeed
    #[error("authentication failed after {} of {} assignments: {message}", .partial.attempted(), .partial.total)]
    Authentication {
        message: String,
        /// Outcome of the pairs attempted before the batch stopped
        partial: BatchResult,
    },

    /// The worker pool could not be created
    #[error("failed to create worker pool: {0}")]
    WorkerPool(String),
}

impl ExecuteError {
    /// Partial result, if the batch got far enough to produce one
    pub fn partial(&self) -> Option<&BatchResult> {
        match self {
            Self::Authentication { partial, .. } => Some(partial),
            Self::WorkerPool(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_preserves_message() {
        let err = RemoteError::other("quota exceeded");
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(!err.is_authentication());
    }

    #[test]
    fn test_remote_error_retryable() {
        assert!(RemoteError::new(RemoteErrorKind::Throttled, "429").is_retryable());
        assert!(RemoteError::new(RemoteErrorKind::Network, "reset").is_retryable());
        assert!(!RemoteError::authentication("expired").is_retryable());
        assert!(!RemoteError::not_found("gone").is_retryable());
    }

    #[test]
    fn test_execute_error_display_counts() {
        let mut partial = BatchResult::new(10);
        partial.record_success();
        let err = ExecuteError::Authentication {
            message: "token expired".into(),
            partial,
        };
        let display = err.to_string();
        assert!(display.contains("1 of 10"));
        assert!(display.contains("token expired"));
        assert_eq!(err.partial().map(|p| p.success), Some(1));
    }

    #[test]
    fn test_empty_selection_display() {
        let err = PlanError::EmptySelection { groups: 0, apps: 2 };
        assert!(err.to_string().contains("0 groups"));
    }
}
