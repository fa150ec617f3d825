//! System-wide constants for NexusDB.
//!
//! This module defines constants used across the execution engine.

// =============================================================================
// Vectorized Execution Constants
// =============================================================================

/// Default maximum number of rows in a column batch.
///
/// Batches start small and double on each reallocation until they reach
/// this size.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Minimum configurable batch size.
pub const MIN_BATCH_SIZE: usize = 1;

/// Maximum configurable batch size.
pub const MAX_BATCH_SIZE: usize = 64 * 1024;

/// Initial capacity of a metadata accumulator.
///
/// Most operators observe at most a single piece of metadata.
pub const METADATA_INITIAL_CAPACITY: usize = 1;

/// Estimated per-value overhead in bytes for variable-width columns.
pub const VARLEN_VALUE_OVERHEAD: usize = 24;

// =============================================================================
// Memory Constants
// =============================================================================

/// Unlimited memory budget.
pub const UNLIMITED_MEMORY: usize = 0;
