//! Batch allocation and memory accounting.
//!
//! Every operator of a flow allocates its batches through an allocator
//! backed by a shared [`MemoryMonitor`], so that the flow as a whole stays
//! within one memory budget.
//!
//! # Growth policy
//!
//! [`BatchAllocator::reset_maybe_reallocate`] starts a batch at the
//! requested minimum capacity and doubles it on every subsequent call until
//! it reaches the allocator's maximum batch size. From then on the same
//! batch is reset and reused. Small inputs therefore never pay for a full
//! batch, and large inputs settle on full batches after a few pulls.

use std::fmt;
use std::sync::Arc;

use nexus_common::{NexusError, NexusResult, DEFAULT_BATCH_SIZE, UNLIMITED_MEMORY};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::batch::{batch_memory_size, Batch};
use crate::types::ColumnType;

/// Accounting state of a monitor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Bytes currently accounted for.
    pub used: usize,
    /// Highest value `used` has reached.
    pub peak: usize,
    /// Number of batches allocated through this monitor.
    pub batch_allocations: u64,
}

/// Tracks memory used by the batches of one flow against a limit.
pub struct MemoryMonitor {
    /// Monitor name, for diagnostics.
    name: String,
    /// Budget in bytes; `UNLIMITED_MEMORY` disables the check.
    limit: usize,
    /// Current usage.
    usage: Mutex<MemoryUsage>,
}

impl MemoryMonitor {
    /// Creates a monitor with the given budget.
    pub fn new(name: impl Into<String>, limit: usize) -> Self {
        Self {
            name: name.into(),
            limit,
            usage: Mutex::new(MemoryUsage::default()),
        }
    }

    /// Creates a monitor without a budget.
    pub fn unlimited(name: impl Into<String>) -> Self {
        Self::new(name, UNLIMITED_MEMORY)
    }

    /// Returns the monitor name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the budget in bytes.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns a snapshot of the current usage.
    pub fn usage(&self) -> MemoryUsage {
        *self.usage.lock()
    }

    /// Accounts for `bytes` more memory.
    pub fn grow(&self, bytes: usize) -> NexusResult<()> {
        self.resize(0, bytes)
    }

    /// Releases `bytes` of previously accounted memory.
    pub fn shrink(&self, bytes: usize) {
        let mut usage = self.usage.lock();
        if bytes > usage.used {
            warn!(
                monitor = %self.name,
                bytes,
                used = usage.used,
                "releasing more memory than accounted for"
            );
        }
        usage.used = usage.used.saturating_sub(bytes);
    }

    /// Replaces an accounted reservation of `old` bytes by one of `new`
    /// bytes. On failure the accounting is left unchanged.
    pub fn resize(&self, old: usize, new: usize) -> NexusResult<()> {
        let mut usage = self.usage.lock();
        let base = usage.used.saturating_sub(old);
        if self.limit != UNLIMITED_MEMORY && base + new > self.limit {
            warn!(
                monitor = %self.name,
                requested = new,
                used = usage.used,
                limit = self.limit,
                "memory budget exceeded"
            );
            return Err(NexusError::MemoryBudgetExceeded {
                requested: new,
                used: usage.used,
                limit: self.limit,
            });
        }
        usage.used = base + new;
        usage.peak = usage.peak.max(usage.used);
        Ok(())
    }

    fn record_batch_allocation(&self) {
        self.usage.lock().batch_allocations += 1;
    }
}

impl fmt::Debug for MemoryMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryMonitor")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .field("usage", &self.usage())
            .finish()
    }
}

/// Allocates and recycles column batches.
pub trait BatchAllocator: fmt::Debug {
    /// Prepares `batch` for the next round of writes.
    ///
    /// If there is no batch yet, or the current one is smaller than the
    /// maximum batch size, a new (larger) batch replaces it. Otherwise the
    /// existing batch is reset in place. Returns whether the batch was
    /// replaced. On error `batch` is left untouched.
    fn reset_maybe_reallocate(
        &self,
        typs: &[ColumnType],
        batch: &mut Option<Batch>,
        min_capacity: usize,
    ) -> NexusResult<bool>;

    /// Allocates a batch with exactly `capacity` slots per column.
    fn new_batch_with_fixed_capacity(
        &self,
        typs: &[ColumnType],
        capacity: usize,
    ) -> NexusResult<Batch>;

    /// Returns a batch's memory to the budget.
    fn release_batch(&self, batch: Batch);

    /// Returns the maximum number of rows in a batch.
    fn max_batch_size(&self) -> usize;
}

/// The standard allocator, accounting against a shared monitor.
#[derive(Debug, Clone)]
pub struct Allocator {
    /// Shared accounting.
    monitor: Arc<MemoryMonitor>,
    /// Maximum batch capacity.
    batch_size: usize,
}

impl Allocator {
    /// Creates an allocator with the default batch size.
    pub fn new(monitor: Arc<MemoryMonitor>) -> Self {
        Self::with_batch_size(monitor, DEFAULT_BATCH_SIZE)
    }

    /// Creates an allocator with the given maximum batch size.
    pub fn with_batch_size(monitor: Arc<MemoryMonitor>, batch_size: usize) -> Self {
        Self {
            monitor,
            batch_size: batch_size.max(1),
        }
    }

    /// Returns the shared monitor.
    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    /// Returns a snapshot of the monitor's usage.
    pub fn usage(&self) -> MemoryUsage {
        self.monitor.usage()
    }
}

impl BatchAllocator for Allocator {
    fn reset_maybe_reallocate(
        &self,
        typs: &[ColumnType],
        batch: &mut Option<Batch>,
        min_capacity: usize,
    ) -> NexusResult<bool> {
        let min_capacity = min_capacity.clamp(1, self.batch_size);
        match batch {
            None => {
                *batch = Some(self.new_batch_with_fixed_capacity(typs, min_capacity)?);
                Ok(true)
            }
            Some(old) if old.capacity() < self.batch_size => {
                let capacity = (old.capacity() * 2)
                    .max(min_capacity)
                    .min(self.batch_size);
                self.monitor
                    .resize(old.memory_size(), batch_memory_size(typs, capacity))?;
                self.monitor.record_batch_allocation();
                debug!(
                    monitor = %self.monitor.name(),
                    old_capacity = old.capacity(),
                    new_capacity = capacity,
                    "reallocating batch"
                );
                *old = Batch::new(typs, capacity);
                Ok(true)
            }
            Some(old) => {
                old.reset_internal_batch();
                Ok(false)
            }
        }
    }

    fn new_batch_with_fixed_capacity(
        &self,
        typs: &[ColumnType],
        capacity: usize,
    ) -> NexusResult<Batch> {
        self.monitor.grow(batch_memory_size(typs, capacity))?;
        self.monitor.record_batch_allocation();
        debug!(
            monitor = %self.monitor.name(),
            capacity,
            width = typs.len(),
            "allocated batch"
        );
        Ok(Batch::new(typs, capacity))
    }

    fn release_batch(&self, batch: Batch) {
        self.monitor.shrink(batch.memory_size());
    }

    fn max_batch_size(&self) -> usize {
        self.batch_size
    }
}
