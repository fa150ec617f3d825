//! Configuration for NexusDB.
//!
//! This module provides configuration structures for the execution engine.

mod execution;

pub use execution::ColExecConfig;
