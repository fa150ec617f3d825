//! # nexus-common
//!
//! Common errors, configuration, and constants for NexusDB.
//!
//! This crate provides the foundational abstractions used across the
//! NexusDB execution components. It includes:
//!
//! - **Errors**: Unified error handling with `NexusError`
//! - **Config**: Vectorized execution configuration
//! - **Constants**: Batch sizing and memory limits
//!
//! ## Example
//!
//! ```rust
//! use nexus_common::config::ColExecConfig;
//! use nexus_common::error::NexusResult;
//!
//! fn example() -> NexusResult<()> {
//!     let config = ColExecConfig::default().with_batch_size(128);
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;

// Re-export commonly used items at the crate root
pub use config::ColExecConfig;
pub use constants::*;
pub use error::{ErrorCode, NexusError, NexusResult};
