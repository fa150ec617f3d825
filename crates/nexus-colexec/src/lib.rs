//! # nexus-colexec
//!
//! Vectorized execution support for NexusDB.
//!
//! This crate implements:
//! - Column batches and their memory-accounted allocation
//! - The vectorized operator protocol
//! - The row source protocol of the row-oriented engine
//! - The `Columnarizer`, which adapts a row source into an operator
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use nexus_colexec::{
//!     Columnarizer, Datum, EncDatumRow, FlowCtx, Operator, ColumnType, ValuesSource,
//! };
//!
//! let ctx = FlowCtx::for_testing();
//! let input = ValuesSource::new(
//!     vec![ColumnType::Int32],
//!     vec![EncDatumRow::from_datums([Datum::int(7)])],
//! );
//! let mut op = Columnarizer::new_buffering(
//!     &ctx,
//!     Arc::new(ctx.new_allocator()),
//!     0,
//!     Box::new(input),
//! );
//! op.init().unwrap();
//! assert_eq!(op.next().unwrap().length(), 1);
//! assert_eq!(op.next().unwrap().length(), 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Batch allocation and memory accounting
pub mod allocator;

/// Column batches
pub mod batch;

/// Row-to-column adapter
pub mod columnarizer;

/// Flow context
pub mod context;

/// Row-to-column conversion
pub mod convert;

/// Scalar values
pub mod datum;

/// Value encoding
pub mod encoding;

/// Producer metadata
pub mod metadata;

/// Vectorized operator protocol
pub mod operator;

/// Processor drain state machine
pub mod processor;

/// Rows of encoded values
pub mod row;

/// Row staging buffer
pub mod row_buffer;

/// Row source protocol
pub mod source;

/// Test utilities
pub mod testing;

/// Column types
pub mod types;

pub use allocator::{Allocator, BatchAllocator, MemoryMonitor, MemoryUsage};
pub use batch::{Batch, ColumnVector, VecData};
pub use columnarizer::{Columnarizer, ColumnarizerMode};
pub use context::FlowCtx;
pub use convert::{enc_datum_rows_to_col_vec, DatumAlloc};
pub use datum::Datum;
pub use encoding::EncDatum;
pub use metadata::{ComponentStats, MetadataSource, ProducerMetadata};
pub use operator::{ColExecError, ColExecResult, Closer, Operator, OperatorInitStatus};
pub use processor::{ProcState, Processor, ProcessorBase};
pub use row::EncDatumRow;
pub use row_buffer::RowBuffer;
pub use source::{OpNode, RowSource, SourceItem, ValuesSource};
pub use types::ColumnType;
