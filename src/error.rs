//! Error types for the proximity engine.

use thiserror::Error;

/// Failure modes surfaced by the proximity engine.
///
/// Configuration problems are rejected when a [`crate::ProximityConfig`] is
/// built; everything the radio collaborators report at runtime comes back
/// as [`RadioUnavailable`](ProximityError::RadioUnavailable) or
/// [`OperationFailed`](ProximityError::OperationFailed) and is retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProximityError {
    /// A caller-supplied value was rejected at configuration time.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The radio is disabled or the feature is unsupported on this device.
    /// Recoverable: re-enable the radio and retry `start`.
    #[error("radio unavailable: {0}")]
    RadioUnavailable(String),

    /// A broadcaster or listener reported a platform failure.
    #[error("operation failed (code {code}): {message}")]
    OperationFailed {
        /// Platform-specific error code as reported by the radio layer.
        code: i32,
        /// Human-readable description of the failure.
        message: String,
    },
}

impl ProximityError {
    /// Shorthand for an [`OperationFailed`](ProximityError::OperationFailed)
    /// carrying a platform error code.
    pub fn operation_failed(code: i32, message: impl Into<String>) -> Self {
        Self::OperationFailed {
            code,
            message: message.into(),
        }
    }

    /// Whether the caller can retry after fixing external conditions.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RadioUnavailable(_) | Self::OperationFailed { .. }
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ProximityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_is_not_recoverable() {
        assert!(!ProximityError::InvalidArgument("bad uuid".into()).is_recoverable());
        assert!(ProximityError::RadioUnavailable("off".into()).is_recoverable());
        assert!(ProximityError::operation_failed(2, "registration failed").is_recoverable());
    }

    #[test]
    fn display_includes_platform_code() {
        let err = ProximityError::operation_failed(5, "out of hardware resources");
        assert_eq!(
            err.to_string(),
            "operation failed (code 5): out of hardware resources"
        );
    }
}
