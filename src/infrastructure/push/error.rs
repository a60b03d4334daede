use thiserror::Error;

use super::constants::{CLOSE_CODE_FORBIDDEN, CLOSE_CODE_UNAUTHORIZED};
use crate::domain::errors::SyncError;

pub type PushResult<T> = Result<T, PushError>;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("invalid push url: {message}")]
    InvalidUrl { message: String },

    #[error("malformed frame: {message}")]
    Decode { message: String },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("not connected")]
    NotConnected,
}

impl PushError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    /// Returns whether the reconnect loop should try again.
    #[must_use]
    pub const fn should_reconnect(&self) -> bool {
        match self {
            Self::ConnectionClosed { code, .. } => {
                !matches!(*code, CLOSE_CODE_UNAUTHORIZED | CLOSE_CODE_FORBIDDEN)
            }
            Self::ConnectionFailed { .. } | Self::WebSocket { .. } | Self::Timeout { .. } => true,
            Self::InvalidUrl { .. }
            | Self::Decode { .. }
            | Self::ReconnectionLimitExceeded { .. }
            | Self::NotConnected => false,
        }
    }

    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        if let Self::ConnectionClosed { code, .. } = self {
            Some(*code)
        } else {
            None
        }
    }
}

impl From<PushError> for SyncError {
    fn from(error: PushError) -> Self {
        Self::channel(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reconnect() {
        assert!(PushError::connection_failed("refused").should_reconnect());
        assert!(PushError::timeout("connection").should_reconnect());
        assert!(
            PushError::ConnectionClosed {
                code: 1006,
                reason: "abnormal".into()
            }
            .should_reconnect()
        );
        assert!(
            !PushError::ConnectionClosed {
                code: CLOSE_CODE_UNAUTHORIZED,
                reason: "bad token".into()
            }
            .should_reconnect()
        );
        assert!(!PushError::ReconnectionLimitExceeded { attempts: 10 }.should_reconnect());
    }

    #[test]
    fn test_into_sync_error() {
        let err: SyncError = PushError::NotConnected.into();
        assert_eq!(err, SyncError::channel("not connected"));
    }
}
