//! Flow context.
//!
//! The flow context carries the configuration and shared resources of one
//! flow (the piece of a distributed query plan running on one node): its
//! memory budget and whether execution statistics are being collected.

use std::sync::Arc;

use nexus_common::{ColExecConfig, NexusResult};

use crate::allocator::{Allocator, MemoryMonitor};

/// Shared state of a running flow.
#[derive(Debug, Clone)]
pub struct FlowCtx {
    /// Flow identifier, for diagnostics.
    flow_id: String,
    /// Execution configuration.
    config: ColExecConfig,
    /// Memory accounting shared by all operators of the flow.
    monitor: Arc<MemoryMonitor>,
}

impl FlowCtx {
    /// Creates a flow context after validating `config`.
    pub fn new(flow_id: impl Into<String>, config: ColExecConfig) -> NexusResult<Self> {
        config.validate()?;
        let flow_id = flow_id.into();
        let monitor = Arc::new(MemoryMonitor::new(
            format!("flow-{flow_id}"),
            config.memory_limit_bytes,
        ));
        Ok(Self {
            flow_id,
            config,
            monitor,
        })
    }

    /// Creates a context with the test configuration.
    pub fn for_testing() -> Self {
        let config = ColExecConfig::for_testing();
        Self {
            flow_id: "test".to_string(),
            monitor: Arc::new(MemoryMonitor::unlimited("flow-test")),
            config,
        }
    }

    /// Returns the flow identifier.
    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ColExecConfig {
        &self.config
    }

    /// Returns true if components should report execution statistics.
    pub fn collect_stats(&self) -> bool {
        self.config.collect_stats
    }

    /// Returns the flow's memory monitor.
    pub fn monitor(&self) -> &Arc<MemoryMonitor> {
        &self.monitor
    }

    /// Creates a batch allocator accounting against the flow's budget.
    pub fn new_allocator(&self) -> Allocator {
        Allocator::with_batch_size(self.monitor.clone(), self.config.batch_size)
    }
}
