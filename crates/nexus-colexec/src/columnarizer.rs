//! Row-to-column adapter.
//!
//! The `Columnarizer` turns a [`RowSource`] into an [`Operator`]: it pulls
//! rows one at a time, stages them in a [`RowBuffer`], and converts the
//! staged rows into a [`Batch`] column by column.
//!
//! Metadata received from the input alongside the rows is accumulated and
//! handed over through [`MetadataSource::drain_meta`], except for errors,
//! which abort the pull that observed them.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use nexus_common::{assertion_failed, METADATA_INITIAL_CAPACITY};
use tracing::{debug, trace, warn};

use crate::allocator::BatchAllocator;
use crate::batch::Batch;
use crate::context::FlowCtx;
use crate::convert::{enc_datum_rows_to_col_vec, DatumAlloc};
use crate::metadata::{ComponentStats, MetadataSource, ProducerMetadata};
use crate::operator::{ColExecError, ColExecResult, Closer, Operator, OperatorInitStatus};
use crate::processor::{ProcState, Processor, ProcessorBase};
use crate::row_buffer::RowBuffer;
use crate::source::{OpNode, RowSource, SourceItem};
use crate::types::ColumnType;

/// How a columnarizer fills its output batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColumnarizerMode {
    /// Buffer up rows, with the batch capacity growing dynamically up to
    /// the allocator's maximum batch size, before emitting a batch.
    Buffering = 0,
    /// Emit every input row as a separate single-row batch.
    Streaming = 1,
}

impl ColumnarizerMode {
    /// Returns the configuration name of this mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnarizerMode::Buffering => "buffering",
            ColumnarizerMode::Streaming => "streaming",
        }
    }
}

impl TryFrom<u8> for ColumnarizerMode {
    type Error = ColExecError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ColumnarizerMode::Buffering),
            1 => Ok(ColumnarizerMode::Streaming),
            other => Err(ColExecError::internal(assertion_failed!(
                "unexpected columnarizer mode {other}"
            ))),
        }
    }
}

impl TryFrom<&str> for ColumnarizerMode {
    type Error = ColExecError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "buffering" => Ok(ColumnarizerMode::Buffering),
            "streaming" => Ok(ColumnarizerMode::Streaming),
            other => Err(ColExecError::assertion(format!(
                "unexpected columnarizer mode '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ColumnarizerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Adapts a row source to the vectorized operator protocol.
pub struct Columnarizer {
    /// Shutdown state machine.
    proc: ProcessorBase,
    /// How batches are filled.
    mode: ColumnarizerMode,
    /// Allocator of the output batch.
    allocator: Arc<dyn BatchAllocator>,
    /// The wrapped row source.
    input: Box<dyn RowSource>,
    /// Context of the flow this columnarizer runs in.
    flow_ctx: FlowCtx,
    /// Identifier of this processor within the flow.
    processor_id: u32,
    /// Decoding scratch, sized by the largest batch seen so far.
    da: DatumAlloc,
    /// Whether `init` has run.
    init_status: OperatorInitStatus,
    /// Rows staged for conversion.
    buffered: RowBuffer,
    /// The output batch, reused across pulls.
    batch: Option<Batch>,
    /// Metadata received from the input, in arrival order.
    accumulated_meta: Vec<ProducerMetadata>,
    /// Output types, captured once from the input.
    typs: Vec<ColumnType>,
    /// Execution statistics.
    stats: ComponentStats,
    /// Whether `close` has run.
    closed: bool,
}

impl Columnarizer {
    /// Creates a columnarizer that buffers rows before emitting them as
    /// batches.
    pub fn new_buffering(
        flow_ctx: &FlowCtx,
        allocator: Arc<dyn BatchAllocator>,
        processor_id: u32,
        input: Box<dyn RowSource>,
    ) -> Self {
        Self::new(
            flow_ctx,
            allocator,
            processor_id,
            input,
            ColumnarizerMode::Buffering,
        )
    }

    /// Creates a columnarizer that emits every input row as a separate
    /// batch.
    pub fn new_streaming(
        flow_ctx: &FlowCtx,
        allocator: Arc<dyn BatchAllocator>,
        processor_id: u32,
        input: Box<dyn RowSource>,
    ) -> Self {
        Self::new(
            flow_ctx,
            allocator,
            processor_id,
            input,
            ColumnarizerMode::Streaming,
        )
    }

    /// Creates a columnarizer in the mode named by the flow's
    /// configuration.
    pub fn from_config(
        flow_ctx: &FlowCtx,
        allocator: Arc<dyn BatchAllocator>,
        processor_id: u32,
        input: Box<dyn RowSource>,
    ) -> ColExecResult<Self> {
        let mode = ColumnarizerMode::try_from(flow_ctx.config().columnarizer_mode.as_str())?;
        Ok(Self::new(flow_ctx, allocator, processor_id, input, mode))
    }

    /// Creates a columnarizer in the given mode.
    pub fn new(
        flow_ctx: &FlowCtx,
        allocator: Arc<dyn BatchAllocator>,
        processor_id: u32,
        input: Box<dyn RowSource>,
        mode: ColumnarizerMode,
    ) -> Self {
        let typs = input.output_types().to_vec();
        let name = format!("columnarizer-{processor_id}");
        debug!(
            processor = %name,
            flow = %flow_ctx.flow_id(),
            %mode,
            width = typs.len(),
            "created columnarizer"
        );
        Self {
            proc: ProcessorBase::new(name.clone()),
            mode,
            allocator,
            input,
            flow_ctx: flow_ctx.clone(),
            processor_id,
            da: DatumAlloc::default(),
            init_status: OperatorInitStatus::NotInitialized,
            buffered: RowBuffer::new(),
            batch: None,
            accumulated_meta: Vec::new(),
            typs,
            stats: ComponentStats {
                component: name,
                ..Default::default()
            },
            closed: false,
        }
    }

    /// Returns the mode of this columnarizer.
    pub fn mode(&self) -> ColumnarizerMode {
        self.mode
    }

    /// Returns the input of this columnarizer.
    pub fn input(&self) -> &dyn RowSource {
        self.input.as_ref()
    }

    /// Returns the processor identifier.
    pub fn processor_id(&self) -> u32 {
        self.processor_id
    }

    /// Returns the execution statistics gathered so far.
    pub fn stats(&self) -> &ComponentStats {
        &self.stats
    }

    /// Returns the number of slots in the row staging buffer.
    pub fn row_buffer_len(&self) -> usize {
        self.buffered.len()
    }

    /// Returns the capacity of the current output batch, if one has been
    /// allocated.
    pub fn batch_capacity(&self) -> Option<usize> {
        self.batch.as_ref().map(Batch::capacity)
    }

    /// Returns the state of the shutdown state machine.
    pub fn proc_state(&self) -> ProcState {
        self.proc.state()
    }

    /// Prepares the output batch for this pull and returns whether it was
    /// replaced.
    fn prepare_batch(&mut self) -> ColExecResult<bool> {
        match self.mode {
            ColumnarizerMode::Buffering => self
                .allocator
                .reset_maybe_reallocate(&self.typs, &mut self.batch, 1)
                .map_err(ColExecError::classify),
            // At most one tuple per batch, so the batch never needs to grow.
            ColumnarizerMode::Streaming => match &mut self.batch {
                Some(batch) => {
                    batch.reset_internal_batch();
                    Ok(false)
                }
                None => {
                    let batch = self
                        .allocator
                        .new_batch_with_fixed_capacity(&self.typs, 1)
                        .map_err(ColExecError::classify)?;
                    self.batch = Some(batch);
                    Ok(true)
                }
            },
        }
    }

    fn trailing_meta(collect_stats: bool, stats: &ComponentStats) -> Vec<ProducerMetadata> {
        if collect_stats {
            vec![ProducerMetadata::ExecStats(stats.clone())]
        } else {
            Vec::new()
        }
    }
}

impl Operator for Columnarizer {
    fn init(&mut self) -> ColExecResult<()> {
        // The input must not be started twice, even if its start failed.
        if self.init_status == OperatorInitStatus::NotInitialized {
            self.init_status = OperatorInitStatus::Initialized;
            self.accumulated_meta = Vec::with_capacity(METADATA_INITIAL_CAPACITY);
            self.input
                .start(&self.flow_ctx)
                .map_err(ColExecError::classify)?;
        }
        Ok(())
    }

    fn next(&mut self) -> ColExecResult<&Batch> {
        if self.init_status != OperatorInitStatus::Initialized {
            return Err(ColExecError::assertion("Columnarizer pulled before init"));
        }
        if self.closed {
            return Err(ColExecError::assertion("Columnarizer pulled after close"));
        }
        let started = Instant::now();

        let reallocated = self.prepare_batch()?;
        let batch = self
            .batch
            .as_mut()
            .ok_or_else(|| ColExecError::assertion("no output batch after allocation"))?;
        if reallocated {
            let old_len = self.buffered.len();
            self.buffered.grow_to(batch.capacity(), self.typs.len());
            debug!(
                processor = %self.stats.component,
                old_len,
                new_len = self.buffered.len(),
                "grew row buffer"
            );
        }

        // Buffer up rows up to the capacity of the batch.
        let capacity = batch.capacity();
        let mut n_rows = 0;
        let mut n_meta = 0;
        while n_rows < capacity {
            match self.input.next() {
                SourceItem::Meta(meta) => {
                    n_meta += 1;
                    self.stats.meta_observed += 1;
                    if let ProducerMetadata::Error(err) = meta {
                        debug!(
                            processor = %self.stats.component,
                            error = %err,
                            staged = n_rows,
                            "input reported an error"
                        );
                        return Err(ColExecError::classify(err));
                    }
                    self.accumulated_meta.push(meta);
                }
                SourceItem::EndOfStream => break,
                SourceItem::Row(row) => {
                    self.buffered.stage(n_rows, row);
                    n_rows += 1;
                }
            }
        }

        if n_rows > self.da.alloc_size {
            self.da.alloc_size = n_rows;
        }

        // Write each column into the output batch.
        let rows = self.buffered.filled(n_rows);
        for (idx, typ) in self.typs.iter().enumerate() {
            let vec = batch.col_vec_mut(idx).ok_or_else(|| {
                ColExecError::assertion(format!("output batch has no column {idx}"))
            })?;
            enc_datum_rows_to_col_vec(rows, vec, idx, typ, &mut self.da)
                .map_err(ColExecError::internal)?;
        }
        batch.set_length(n_rows);

        self.stats.rows_read += n_rows as u64;
        self.stats.rows_output += n_rows as u64;
        self.stats.batches_output += 1;
        self.stats.max_batch_len = self.stats.max_batch_len.max(n_rows);
        self.stats.exec_time += started.elapsed();
        trace!(
            processor = %self.stats.component,
            rows = n_rows,
            meta = n_meta,
            capacity,
            "emitting batch"
        );

        Ok(&*batch)
    }

    fn output_types(&self) -> &[ColumnType] {
        &self.typs
    }
}

impl MetadataSource for Columnarizer {
    fn drain_meta(&mut self) -> Vec<ProducerMetadata> {
        // An input that was never started has nothing to drain.
        if self.init_status == OperatorInitStatus::Initialized {
            self.proc.move_to_draining(self.input.as_mut(), None);
            let collect_stats = self.flow_ctx.collect_stats();
            while let Some(meta) = self.proc.drain_helper(self.input.as_mut(), || {
                Self::trailing_meta(collect_stats, &self.stats)
            }) {
                self.accumulated_meta.push(meta);
            }
        }
        debug!(
            processor = %self.stats.component,
            count = self.accumulated_meta.len(),
            "drained metadata"
        );
        std::mem::take(&mut self.accumulated_meta)
    }
}

impl Closer for Columnarizer {
    fn close(&mut self) -> ColExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Err(err) = self.input.consumer_closed() {
            warn!(
                processor = %self.stats.component,
                error = %err,
                "error closing columnarizer input"
            );
        }
        if let Some(batch) = self.batch.take() {
            self.allocator.release_batch(batch);
        }
        Ok(())
    }
}

impl Processor for Columnarizer {
    fn run(&mut self) -> ColExecResult<()> {
        Err(ColExecError::assertion("Columnarizer should not be run"))
    }
}

impl OpNode for Columnarizer {
    fn name(&self) -> &str {
        "columnarizer"
    }

    fn child_count(&self, _verbose: bool) -> usize {
        usize::from(self.input.as_op_node().is_some())
    }

    fn child(&self, nth: usize, _verbose: bool) -> ColExecResult<&dyn OpNode> {
        if nth == 0 {
            return self.input.as_op_node().ok_or_else(|| {
                ColExecError::assertion("input to Columnarizer is not an OpNode")
            });
        }
        Err(ColExecError::internal(assertion_failed!("invalid index {nth}")))
    }
}

impl Drop for Columnarizer {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.allocator.release_batch(batch);
        }
    }
}

impl fmt::Debug for Columnarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Columnarizer")
            .field("processor_id", &self.processor_id)
            .field("mode", &self.mode)
            .field("typs", &self.typs)
            .field("init_status", &self.init_status)
            .field("state", &self.proc.state())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocator, MemoryMonitor};
    use crate::datum::Datum;
    use crate::encoding::EncDatum;
    use crate::row::EncDatumRow;
    use crate::testing::ScriptedSource;
    use nexus_common::NexusError;

    fn int_row(v: i64) -> EncDatumRow {
        EncDatumRow::new(vec![EncDatum::encode(&Datum::bigint(v))])
    }

    fn allocator(batch_size: usize) -> Arc<Allocator> {
        Arc::new(Allocator::with_batch_size(
            Arc::new(MemoryMonitor::unlimited("test")),
            batch_size,
        ))
    }

    fn buffering(src: ScriptedSource, batch_size: usize) -> Columnarizer {
        Columnarizer::new_buffering(
            &FlowCtx::for_testing(),
            allocator(batch_size),
            1,
            Box::new(src),
        )
    }

    #[test]
    fn test_mode_from_code_and_name() {
        assert_eq!(ColumnarizerMode::try_from(0u8).unwrap(), ColumnarizerMode::Buffering);
        assert_eq!(ColumnarizerMode::try_from(1u8).unwrap(), ColumnarizerMode::Streaming);
        assert!(ColumnarizerMode::try_from(2u8).unwrap_err().is_internal());
        assert_eq!(
            ColumnarizerMode::try_from("streaming").unwrap(),
            ColumnarizerMode::Streaming
        );
        assert!(ColumnarizerMode::try_from("eager").unwrap_err().is_internal());
    }

    #[test]
    fn test_next_before_init_is_internal_error() {
        let mut c = buffering(ScriptedSource::new(vec![ColumnType::Int64]), 4);
        assert!(c.next().unwrap_err().is_internal());
    }

    #[test]
    fn test_row_buffer_tracks_batch_growth() {
        let rows = (0..10).map(int_row);
        let src = ScriptedSource::with_rows(vec![ColumnType::Int64], rows);
        let mut c = buffering(src, 4);
        c.init().unwrap();

        let mut lens = Vec::new();
        loop {
            let len = c.next().unwrap().length();
            assert_eq!(c.row_buffer_len(), c.batch_capacity().unwrap());
            if len == 0 {
                break;
            }
            lens.push(len);
        }
        assert_eq!(lens, vec![1, 2, 4, 3]);
        assert_eq!(c.stats().rows_read, 10);
        assert_eq!(c.stats().max_batch_len, 4);
    }

    #[test]
    fn test_alloc_size_hint_only_grows() {
        let src = ScriptedSource::with_rows(vec![ColumnType::Int64], (0..3).map(int_row));
        let mut c = buffering(src, 2);
        c.init().unwrap();
        c.next().unwrap();
        c.next().unwrap();
        assert_eq!(c.da.alloc_size, 2);
        c.next().unwrap();
        assert_eq!(c.da.alloc_size, 2);
    }

    #[test]
    fn test_conversion_failure_is_internal() {
        let src = ScriptedSource::new(vec![ColumnType::Int64])
            .row(EncDatumRow::new(vec![EncDatum::encode(&Datum::string("x"))]));
        let mut c = buffering(src, 4);
        c.init().unwrap();
        let err = c.next().unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(err.inner(), NexusError::TypeMismatch { .. }));
    }

    #[test]
    fn test_start_failure_propagates() {
        let src = ScriptedSource::new(vec![]).fail_start(NexusError::execution_failed("no"));
        let recorder = src.recorder();
        let mut c = buffering(src, 4);
        assert!(c.init().is_err());
        assert!(c.init().is_ok());
        assert_eq!(recorder.get().start, 1);
    }

    #[test]
    fn test_run_is_rejected() {
        let mut c = buffering(ScriptedSource::new(vec![]), 4);
        assert!(c.run().unwrap_err().is_internal());
    }

    #[test]
    fn test_drop_releases_batch_memory() {
        let alloc = allocator(4);
        let src = ScriptedSource::with_rows(vec![ColumnType::Int64], (0..2).map(int_row));
        let mut c =
            Columnarizer::new_buffering(&FlowCtx::for_testing(), alloc.clone(), 1, Box::new(src));
        c.init().unwrap();
        c.next().unwrap();
        assert!(alloc.usage().used > 0);
        drop(c);
        assert_eq!(alloc.usage().used, 0);
    }
}
