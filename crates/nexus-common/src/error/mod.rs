//! Error handling for NexusDB.
//!
//! A single error type with stable error codes is shared by every
//! component. Query-level and engine-level failures are distinguished with
//! [`NexusError::is_internal`].

mod database;

pub use database::{ErrorCode, NexusError};

/// Result type alias for NexusDB operations.
pub type NexusResult<T> = std::result::Result<T, NexusError>;

/// Builds a [`NexusError::AssertionFailed`] from a format string.
///
/// ```rust
/// use nexus_common::assertion_failed;
///
/// let err = assertion_failed!("invalid index {}", 3);
/// assert_eq!(err.to_string(), "assertion failed: invalid index 3");
/// ```
#[macro_export]
macro_rules! assertion_failed {
    ($($arg:tt)*) => {
        $crate::error::NexusError::assertion_failed(format!($($arg)*))
    };
}
