//! Test utilities.
//!
//! [`ScriptedSource`] is a row source that replays a fixed script of rows
//! and metadata and records how it was driven.

use std::collections::VecDeque;
use std::sync::Arc;

use nexus_common::{NexusError, NexusResult};
use parking_lot::Mutex;

use crate::context::FlowCtx;
use crate::metadata::ProducerMetadata;
use crate::operator::{ColExecError, ColExecResult};
use crate::row::EncDatumRow;
use crate::source::{OpNode, RowSource, SourceItem};
use crate::types::ColumnType;

/// Number of times each protocol method was called.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SourceCalls {
    /// Calls to `start`.
    pub start: usize,
    /// Calls to `next`.
    pub next: usize,
    /// Calls to `consumer_done`.
    pub consumer_done: usize,
    /// Calls to `consumer_closed`.
    pub consumer_closed: usize,
}

/// Shared view of a source's call counters, usable after the source has
/// been moved into its consumer.
#[derive(Debug, Default, Clone)]
pub struct CallRecorder(Arc<Mutex<SourceCalls>>);

impl CallRecorder {
    /// Returns a snapshot of the counters.
    pub fn get(&self) -> SourceCalls {
        *self.0.lock()
    }

    fn record(&self, f: impl FnOnce(&mut SourceCalls)) {
        f(&mut self.0.lock());
    }
}

#[derive(Debug)]
enum Step {
    Row(EncDatumRow),
    Meta(ProducerMetadata),
}

/// A row source replaying a script.
///
/// Script items are produced in order regardless of `consumer_done`. Once
/// the script is exhausted, trailing metadata is produced if the consumer
/// has signalled it is done, followed by the end of the stream.
#[derive(Debug)]
pub struct ScriptedSource {
    typs: Vec<ColumnType>,
    steps: VecDeque<Step>,
    trailing: VecDeque<ProducerMetadata>,
    current: Option<EncDatumRow>,
    calls: CallRecorder,
    start_error: Option<NexusError>,
    close_error: Option<NexusError>,
    node_name: Option<String>,
    done: bool,
}

impl ScriptedSource {
    /// Creates an empty script producing rows of `typs`.
    pub fn new(typs: Vec<ColumnType>) -> Self {
        Self {
            typs,
            steps: VecDeque::new(),
            trailing: VecDeque::new(),
            current: None,
            calls: CallRecorder::default(),
            start_error: None,
            close_error: None,
            node_name: None,
            done: false,
        }
    }

    /// Creates a script of `rows`.
    pub fn with_rows(typs: Vec<ColumnType>, rows: impl IntoIterator<Item = EncDatumRow>) -> Self {
        rows.into_iter().fold(Self::new(typs), Self::row)
    }

    /// Appends a row.
    #[must_use]
    pub fn row(mut self, row: EncDatumRow) -> Self {
        self.steps.push_back(Step::Row(row));
        self
    }

    /// Appends metadata.
    #[must_use]
    pub fn meta(mut self, meta: ProducerMetadata) -> Self {
        self.steps.push_back(Step::Meta(meta));
        self
    }

    /// Appends an error.
    #[must_use]
    pub fn error(self, err: NexusError) -> Self {
        self.meta(ProducerMetadata::Error(err))
    }

    /// Adds metadata produced only after `consumer_done`.
    #[must_use]
    pub fn trailing_meta(mut self, meta: ProducerMetadata) -> Self {
        self.trailing.push_back(meta);
        self
    }

    /// Makes `start` fail with `err`.
    #[must_use]
    pub fn fail_start(mut self, err: NexusError) -> Self {
        self.start_error = Some(err);
        self
    }

    /// Makes the first `consumer_closed` fail with `err`.
    #[must_use]
    pub fn fail_close(mut self, err: NexusError) -> Self {
        self.close_error = Some(err);
        self
    }

    /// Exposes the source as a plan node called `name`.
    #[must_use]
    pub fn as_plan_node(mut self, name: impl Into<String>) -> Self {
        self.node_name = Some(name.into());
        self
    }

    /// Returns a snapshot of the call counters.
    pub fn calls(&self) -> SourceCalls {
        self.calls.get()
    }

    /// Returns a shared handle on the call counters.
    pub fn recorder(&self) -> CallRecorder {
        self.calls.clone()
    }
}

impl RowSource for ScriptedSource {
    fn output_types(&self) -> &[ColumnType] {
        &self.typs
    }

    fn start(&mut self, _ctx: &FlowCtx) -> NexusResult<()> {
        self.calls.record(|c| c.start += 1);
        match self.start_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn next(&mut self) -> SourceItem<'_> {
        self.calls.record(|c| c.next += 1);
        match self.steps.pop_front() {
            Some(Step::Row(row)) => SourceItem::Row(self.current.insert(row).values()),
            Some(Step::Meta(meta)) => SourceItem::Meta(meta),
            None if self.done => match self.trailing.pop_front() {
                Some(meta) => SourceItem::Meta(meta),
                None => SourceItem::EndOfStream,
            },
            None => SourceItem::EndOfStream,
        }
    }

    fn consumer_done(&mut self) {
        self.calls.record(|c| c.consumer_done += 1);
        self.done = true;
    }

    fn consumer_closed(&mut self) -> NexusResult<()> {
        self.calls.record(|c| c.consumer_closed += 1);
        match self.close_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn as_op_node(&self) -> Option<&dyn OpNode> {
        self.node_name.as_ref().map(|_| self as &dyn OpNode)
    }
}

impl OpNode for ScriptedSource {
    fn name(&self) -> &str {
        self.node_name.as_deref().unwrap_or("scripted")
    }

    fn child_count(&self, _verbose: bool) -> usize {
        0
    }

    fn child(&self, nth: usize, _verbose: bool) -> ColExecResult<&dyn OpNode> {
        Err(ColExecError::assertion(format!("invalid index {nth}")))
    }
}
