//! Database error types.
//!
//! Provides the error types shared by the execution components.

use std::fmt;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Operation was cancelled.
    Cancelled = 0x0005,
    /// An engine assertion did not hold.
    AssertionFailed = 0x0006,

    // I/O errors (0x0100 - 0x01FF)
    /// General I/O error.
    Io = 0x0100,

    // Memory errors (0x0200 - 0x02FF)
    /// Memory budget exhausted.
    MemoryBudgetExceeded = 0x0200,

    // Query errors (0x0600 - 0x06FF)
    /// Type mismatch.
    TypeMismatch = 0x0603,
    /// Query execution failed.
    ExecutionFailed = 0x0605,
    /// Value encoding is malformed.
    Encoding = 0x0606,

    // Configuration errors (0x0700 - 0x07FF)
    /// Invalid configuration.
    InvalidConfig = 0x0700,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "I/O",
            0x02 => "Memory",
            0x06 => "Query",
            0x07 => "Configuration",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The main error type for NexusDB.
///
/// Each variant includes relevant context for debugging.
///
/// # Example
///
/// ```rust
/// use nexus_common::error::{NexusError, NexusResult};
///
/// fn reserve(requested: usize, limit: usize) -> NexusResult<()> {
///     Err(NexusError::MemoryBudgetExceeded { requested, used: 0, limit })
/// }
/// ```
#[derive(Debug, Error)]
pub enum NexusError {
    // ==========================================================================
    // General Errors
    // ==========================================================================
    /// Internal error - this indicates a bug.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },

    /// An engine invariant was violated.
    #[error("assertion failed: {message}")]
    AssertionFailed {
        /// Description of the violated invariant.
        message: String,
    },

    /// Operation not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: String,
    },

    /// Invalid argument provided.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Error message.
        message: String,
    },

    /// Operation was cancelled.
    #[error("operation was cancelled")]
    Cancelled,

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    // ==========================================================================
    // Memory Errors
    // ==========================================================================
    /// An allocation would exceed the memory budget.
    #[error("memory budget exceeded: {requested} bytes requested, {used} of {limit} bytes in use")]
    MemoryBudgetExceeded {
        /// Bytes requested by the allocation.
        requested: usize,
        /// Bytes already accounted for.
        used: usize,
        /// The configured limit.
        limit: usize,
    },

    // ==========================================================================
    // Query Errors
    // ==========================================================================
    /// Type mismatch.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type.
        expected: String,
        /// Actual type.
        actual: String,
    },

    /// Query execution failed.
    #[error("query execution failed: {reason}")]
    ExecutionFailed {
        /// Reason for failure.
        reason: String,
    },

    /// An encoded value could not be decoded.
    #[error("encoding error: {message}")]
    Encoding {
        /// Error message.
        message: String,
    },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid configuration.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Error message.
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration: {source}")]
    Config {
        /// The underlying parse error.
        #[from]
        source: toml::de::Error,
    },
}

impl NexusError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Internal { .. } => ErrorCode::Internal,
            Self::AssertionFailed { .. } => ErrorCode::AssertionFailed,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Io { .. } => ErrorCode::Io,
            Self::MemoryBudgetExceeded { .. } => ErrorCode::MemoryBudgetExceeded,
            Self::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            Self::ExecutionFailed { .. } => ErrorCode::ExecutionFailed,
            Self::Encoding { .. } => ErrorCode::Encoding,
            Self::InvalidConfig { .. } | Self::Config { .. } => ErrorCode::InvalidConfig,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::MemoryBudgetExceeded { .. })
    }

    /// Returns true if this error indicates a bug in the engine rather than
    /// a problem with the query or its data.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. } | Self::AssertionFailed { .. })
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an assertion failure.
    #[must_use]
    pub fn assertion_failed(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an execution failure.
    #[must_use]
    pub fn execution_failed(reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            reason: reason.into(),
        }
    }

    /// Creates an encoding error.
    #[must_use]
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        let err = NexusError::MemoryBudgetExceeded {
            requested: 10,
            used: 90,
            limit: 95,
        };
        assert_eq!(err.code(), ErrorCode::MemoryBudgetExceeded);
        assert_eq!(err.code().category(), "Memory");
        assert_eq!(NexusError::encoding("x").code().category(), "Query");
    }

    #[test]
    fn test_error_display() {
        let err = NexusError::execution_failed("division by zero");
        assert_eq!(err.to_string(), "query execution failed: division by zero");

        let err = NexusError::assertion_failed("unexpected mode 7");
        assert_eq!(err.to_string(), "assertion failed: unexpected mode 7");
    }

    #[test]
    fn test_internal() {
        assert!(NexusError::internal("bug").is_internal());
        assert!(NexusError::assertion_failed("bug").is_internal());
        assert!(!NexusError::execution_failed("user").is_internal());
        assert!(!NexusError::Cancelled.is_internal());
    }

    #[test]
    fn test_retryable() {
        let err = NexusError::MemoryBudgetExceeded {
            requested: 1,
            used: 1,
            limit: 1,
        };
        assert!(err.is_retryable());
        assert!(!NexusError::Cancelled.is_retryable());
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let nexus_err: NexusError = io_err.into();
        assert_eq!(nexus_err.code(), ErrorCode::Io);
    }
}
