//! Row-at-a-time source protocol.
//!
//! Row sources are the pull-based, one-row-per-call producers of the
//! row-oriented execution engine. Each pull yields a row, a piece of
//! metadata, or the end of the stream:
//!
//! ```ignore
//! source.start(&ctx)?;
//! loop {
//!     match source.next() {
//!         SourceItem::Row(row) => { /* copy the row out */ }
//!         SourceItem::Meta(meta) => { /* forward or accumulate */ }
//!         SourceItem::EndOfStream => break,
//!     }
//! }
//! source.consumer_closed()?;
//! ```

use std::fmt;

use nexus_common::{NexusError, NexusResult};

use crate::context::FlowCtx;
use crate::encoding::EncDatum;
use crate::metadata::ProducerMetadata;
use crate::operator::{ColExecError, ColExecResult};
use crate::row::EncDatumRow;
use crate::types::ColumnType;

/// One item pulled from a row source.
///
/// A row is borrowed from the source and only valid until the next pull;
/// consumers that need it longer must copy it.
#[derive(Debug)]
pub enum SourceItem<'a> {
    /// The next row.
    Row(&'a [EncDatum]),
    /// Out-of-band metadata.
    Meta(ProducerMetadata),
    /// The source is exhausted.
    EndOfStream,
}

/// A node of a physical plan, as shown by plan visualization tools.
pub trait OpNode: fmt::Debug {
    /// Returns the node name.
    fn name(&self) -> &str;

    /// Returns the number of children.
    fn child_count(&self, verbose: bool) -> usize;

    /// Returns the `nth` child. Asking for a child that does not exist is
    /// an internal error.
    fn child(&self, nth: usize, verbose: bool) -> ColExecResult<&dyn OpNode>;
}

/// A pull-based producer of rows and metadata.
pub trait RowSource: fmt::Debug {
    /// Returns the types of the rows this source produces. The types do not
    /// change during execution.
    fn output_types(&self) -> &[ColumnType];

    /// Prepares the source for pulls.
    fn start(&mut self, ctx: &FlowCtx) -> NexusResult<()>;

    /// Pulls the next item.
    fn next(&mut self) -> SourceItem<'_>;

    /// Tells the source that no more rows are needed. Later pulls only
    /// return the remaining metadata, then the end of the stream.
    fn consumer_done(&mut self);

    /// Tells the source that nothing more will be pulled, so it can release
    /// its resources.
    fn consumer_closed(&mut self) -> NexusResult<()>;

    /// Returns this source as a plan node, if it is one.
    fn as_op_node(&self) -> Option<&dyn OpNode> {
        None
    }
}

/// A row source over a fixed set of in-memory rows.
#[derive(Debug)]
pub struct ValuesSource {
    /// Output types.
    typs: Vec<ColumnType>,
    /// Rows to produce.
    rows: Vec<EncDatumRow>,
    /// Index of the next row.
    pos: usize,
    /// Whether `start` has been called.
    started: bool,
    /// Whether the consumer is done.
    done: bool,
    /// Whether the consumer closed the source.
    closed: bool,
}

impl ValuesSource {
    /// Creates a source producing `rows`.
    pub fn new(typs: Vec<ColumnType>, rows: Vec<EncDatumRow>) -> Self {
        Self {
            typs,
            rows,
            pos: 0,
            started: false,
            done: false,
            closed: false,
        }
    }

    /// Returns true once the consumer has closed the source.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl RowSource for ValuesSource {
    fn output_types(&self) -> &[ColumnType] {
        &self.typs
    }

    fn start(&mut self, _ctx: &FlowCtx) -> NexusResult<()> {
        if self.started {
            return Err(NexusError::internal("values source started twice"));
        }
        if let Some(row) = self.rows.iter().find(|r| r.num_columns() != self.typs.len()) {
            return Err(NexusError::invalid_argument(format!(
                "row {} has {} columns, expected {}",
                row,
                row.num_columns(),
                self.typs.len()
            )));
        }
        self.started = true;
        Ok(())
    }

    fn next(&mut self) -> SourceItem<'_> {
        if !self.started {
            return SourceItem::Meta(ProducerMetadata::Error(NexusError::internal(
                "values source pulled before start",
            )));
        }
        if self.done || self.closed || self.pos >= self.rows.len() {
            return SourceItem::EndOfStream;
        }
        self.pos += 1;
        SourceItem::Row(self.rows[self.pos - 1].values())
    }

    fn consumer_done(&mut self) {
        self.done = true;
    }

    fn consumer_closed(&mut self) -> NexusResult<()> {
        self.closed = true;
        Ok(())
    }

    fn as_op_node(&self) -> Option<&dyn OpNode> {
        Some(self)
    }
}

impl OpNode for ValuesSource {
    fn name(&self) -> &str {
        "values"
    }

    fn child_count(&self, _verbose: bool) -> usize {
        0
    }

    fn child(&self, nth: usize, _verbose: bool) -> ColExecResult<&dyn OpNode> {
        Err(ColExecError::assertion(format!("invalid index {nth}")))
    }
}
