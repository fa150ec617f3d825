//! Vectorized operator protocol.
//!
//! Vectorized operators produce [`Batch`]es in a pull-based iterator model.
//! A zero-length batch means the operator is exhausted:
//!
//! ```ignore
//! op.init()?;
//! loop {
//!     let batch = op.next()?;
//!     if batch.is_empty() {
//!         break;
//!     }
//!     // Process batch
//! }
//! ```
//!
//! The returned batch is borrowed from the operator and is overwritten by
//! the next call, so it cannot outlive the pull that produced it.

use nexus_common::NexusError;
use thiserror::Error;

use crate::batch::Batch;
use crate::source::OpNode;
use crate::types::ColumnType;

/// Error raised by a vectorized operator.
///
/// An `Expected` error is an outcome of running the query and may be shown
/// to the user. An `Internal` error means an engine invariant was broken
/// and must only ever be reported as an internal error.
#[derive(Debug, Error)]
pub enum ColExecError {
    /// A query or data error, such as an error reported by an input.
    #[error(transparent)]
    Expected(NexusError),

    /// An engine invariant violation.
    #[error("internal executor error: {0}")]
    Internal(NexusError),
}

impl ColExecError {
    /// Wraps a query-level error.
    pub fn expected(err: NexusError) -> Self {
        ColExecError::Expected(err)
    }

    /// Wraps an error as an invariant violation.
    pub fn internal(err: NexusError) -> Self {
        ColExecError::Internal(err)
    }

    /// Creates an invariant violation from a message.
    pub fn assertion(message: impl Into<String>) -> Self {
        ColExecError::Internal(NexusError::assertion_failed(message))
    }

    /// Wraps `err` according to its own classification.
    pub fn classify(err: NexusError) -> Self {
        if err.is_internal() {
            ColExecError::Internal(err)
        } else {
            ColExecError::Expected(err)
        }
    }

    /// Returns true if this is an invariant violation.
    pub fn is_internal(&self) -> bool {
        matches!(self, ColExecError::Internal(_))
    }

    /// Returns the wrapped error.
    pub fn inner(&self) -> &NexusError {
        match self {
            ColExecError::Expected(e) | ColExecError::Internal(e) => e,
        }
    }

    /// Consumes the error and returns the wrapped error.
    pub fn into_inner(self) -> NexusError {
        match self {
            ColExecError::Expected(e) | ColExecError::Internal(e) => e,
        }
    }
}

impl From<ColExecError> for NexusError {
    fn from(err: ColExecError) -> Self {
        match err {
            ColExecError::Expected(e) => e,
            ColExecError::Internal(e) if e.is_internal() => e,
            ColExecError::Internal(e) => NexusError::internal(e.to_string()),
        }
    }
}

/// Result type for vectorized operators.
pub type ColExecResult<T> = Result<T, ColExecError>;

/// Initialization state of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorInitStatus {
    /// `init` has not been called.
    #[default]
    NotInitialized,
    /// `init` has completed.
    Initialized,
}

/// A vectorized operator.
pub trait Operator: OpNode {
    /// Prepares the operator and its inputs. Calling `init` more than once
    /// has no further effect.
    fn init(&mut self) -> ColExecResult<()>;

    /// Returns the next batch. A zero-length batch signals the end of the
    /// output.
    fn next(&mut self) -> ColExecResult<&Batch>;

    /// Returns the types of the output columns.
    fn output_types(&self) -> &[ColumnType];
}

/// A component holding resources that must be released when the consumer
/// is done with it.
pub trait Closer {
    /// Releases resources.
    fn close(&mut self) -> ColExecResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert!(ColExecError::classify(NexusError::internal("bug")).is_internal());
        assert!(!ColExecError::classify(NexusError::execution_failed("user")).is_internal());
    }

    #[test]
    fn test_display() {
        let err = ColExecError::expected(NexusError::execution_failed("boom"));
        assert_eq!(err.to_string(), "query execution failed: boom");

        let err = ColExecError::assertion("invalid index 2");
        assert_eq!(
            err.to_string(),
            "internal executor error: assertion failed: invalid index 2"
        );
    }

    #[test]
    fn test_internal_never_surfaces_as_user_error() {
        let err: NexusError = ColExecError::internal(NexusError::encoding("bad tag")).into();
        assert!(err.is_internal());

        let err: NexusError = ColExecError::expected(NexusError::Cancelled).into();
        assert!(matches!(err, NexusError::Cancelled));
    }
}
