//! Processor drain state machine.
//!
//! Once a component stops producing rows, it still owes its consumer the
//! metadata of everything upstream. `ProcessorBase` implements that
//! shutdown sequence:
//!
//! ```text
//!   Running --move_to_draining--> Draining --input exhausted--> TrailingMeta
//!                                                                    |
//!                                          Exhausted <--queue empty--+
//! ```
//!
//! While draining, the input is told that its consumer is done, and every
//! further pull discards rows and forwards metadata. Once the input is
//! exhausted the component's own trailing metadata (such as execution
//! statistics) is emitted.

use std::collections::VecDeque;

use nexus_common::NexusError;
use tracing::debug;

use crate::metadata::ProducerMetadata;
use crate::operator::ColExecResult;
use crate::source::{RowSource, SourceItem};

/// A push-based processor, which runs to completion sending its output to
/// a consumer.
pub trait Processor {
    /// Runs the processor until its output is exhausted.
    fn run(&mut self) -> ColExecResult<()>;
}

/// State of a processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcState {
    /// Producing rows.
    #[default]
    Running,
    /// Forwarding the input's remaining metadata.
    Draining,
    /// Emitting the processor's own trailing metadata.
    TrailingMeta,
    /// Nothing left to emit.
    Exhausted,
}

/// Shared shutdown logic of processors with a single input.
#[derive(Debug, Default)]
pub struct ProcessorBase {
    /// Processor name, for diagnostics.
    name: String,
    /// Current state.
    state: ProcState,
    /// Trailing metadata not yet emitted.
    trailing_meta: VecDeque<ProducerMetadata>,
    /// Rows discarded while draining.
    rows_discarded: u64,
}

impl ProcessorBase {
    /// Creates a processor in the running state.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ProcState {
        self.state
    }

    /// Returns the number of rows discarded while draining.
    pub fn rows_discarded(&self) -> u64 {
        self.rows_discarded
    }

    /// Stops producing rows and starts draining `input`.
    ///
    /// An error, if given, is emitted first among the trailing metadata.
    /// Has no effect unless the processor is running.
    pub fn move_to_draining(&mut self, input: &mut dyn RowSource, err: Option<NexusError>) {
        if self.state != ProcState::Running {
            debug!(processor = %self.name, state = ?self.state, "already draining");
            return;
        }
        if let Some(err) = err {
            self.trailing_meta.push_back(ProducerMetadata::Error(err));
        }
        debug!(processor = %self.name, "moving to draining");
        input.consumer_done();
        self.state = ProcState::Draining;
    }

    /// Returns the next piece of metadata to emit while shutting down, or
    /// `None` once everything has been emitted.
    ///
    /// `trailing` is invoked once, when the input is exhausted, to produce
    /// the processor's own trailing metadata.
    pub fn drain_helper<F>(
        &mut self,
        input: &mut dyn RowSource,
        trailing: F,
    ) -> Option<ProducerMetadata>
    where
        F: FnOnce() -> Vec<ProducerMetadata>,
    {
        if self.state == ProcState::Running {
            self.move_to_draining(input, None);
        }

        if self.state == ProcState::Draining {
            loop {
                match input.next() {
                    SourceItem::Row(_) => self.rows_discarded += 1,
                    SourceItem::Meta(meta) => return Some(meta),
                    SourceItem::EndOfStream => break,
                }
            }
            debug!(
                processor = %self.name,
                rows_discarded = self.rows_discarded,
                "input drained"
            );
            self.trailing_meta.extend(trailing());
            self.state = ProcState::TrailingMeta;
        }

        if self.state == ProcState::TrailingMeta {
            if let Some(meta) = self.trailing_meta.pop_front() {
                return Some(meta);
            }
            self.state = ProcState::Exhausted;
        }

        None
    }
}
