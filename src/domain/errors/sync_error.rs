//! Synchronization error types.

use thiserror::Error;

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failures surfaced by the sync layer.
///
/// The first four variants are the categories consumers react to; the
/// transport-level variants carry detail and are classified by
/// [`SyncError::is_fetch_failure`] and friends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum SyncError {
    #[error("failed to fetch {what}: {message}")]
    Fetch { what: String, message: String },

    #[error("server rejected {operation}: {message}")]
    Mutation { operation: String, message: String },

    #[error("push channel failure: {message}")]
    Channel { message: String },

    #[error("invalid input: {message}")]
    Validation { message: String },

    #[error("record {id} not found")]
    NotFound { id: String },

    #[error("request not authorized")]
    Unauthorized,

    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("failed to decode response: {message}")]
    Decode { message: String },
}

impl SyncError {
    /// Creates a fetch failure.
    #[must_use]
    pub fn fetch(what: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Creates a mutation failure.
    #[must_use]
    pub fn mutation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Mutation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a channel failure.
    #[must_use]
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Creates a validation failure.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Wraps a transport error raised while loading `what`. Only errors
    /// that are already fetch failures pass through unchanged.
    #[must_use]
    pub fn into_fetch(self, what: &str) -> Self {
        match self {
            Self::Fetch { .. } => self,
            other => Self::fetch(what, other.to_string()),
        }
    }

    /// Wraps a transport error raised while performing `operation`.
    ///
    /// A server-side validation rejection is still a rejected mutation;
    /// local validation errors never reach the transport.
    #[must_use]
    pub fn into_mutation(self, operation: &str) -> Self {
        match self {
            Self::Mutation { .. } => self,
            other => Self::mutation(operation, other.to_string()),
        }
    }

    /// Returns whether this is a list/count retrieval failure.
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Returns whether the server rejected an optimistic change.
    #[must_use]
    pub const fn is_mutation_failure(&self) -> bool {
        matches!(self, Self::Mutation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_fetch_wraps_transport_errors() {
        let err = SyncError::network("connection refused").into_fetch("notifications");
        assert!(err.is_fetch_failure());
        assert_eq!(
            err.to_string(),
            "failed to fetch notifications: network error: connection refused"
        );
    }

    #[test]
    fn test_into_fetch_wraps_validation() {
        let err = SyncError::validation("bad page").into_fetch("notifications");
        assert!(err.is_fetch_failure());
    }

    #[test]
    fn test_into_mutation_wraps_server_validation() {
        let err = SyncError::validation("already read").into_mutation("mark_read");
        assert!(err.is_mutation_failure());
        assert_eq!(
            err.to_string(),
            "server rejected mark_read: invalid input: already read"
        );

        let err = SyncError::mutation("send", "nope").into_mutation("other");
        assert_eq!(err, SyncError::mutation("send", "nope"));

        let err = SyncError::Unauthorized.into_mutation("mark_read");
        assert!(err.is_mutation_failure());
    }
}
