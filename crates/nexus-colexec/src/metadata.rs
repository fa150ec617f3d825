//! Producer metadata.
//!
//! Besides rows, processors emit out-of-band metadata: errors, progress
//! information, and execution statistics. Metadata travels interleaved with
//! rows and is collected by consumers at the end of execution.

use std::fmt;
use std::time::Duration;

use nexus_common::NexusError;

/// Execution statistics of a single component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentStats {
    /// Name of the component the statistics belong to.
    pub component: String,
    /// Rows read from the component's input.
    pub rows_read: u64,
    /// Batches produced.
    pub batches_output: u64,
    /// Rows produced.
    pub rows_output: u64,
    /// Metadata items observed from the input.
    pub meta_observed: u64,
    /// Largest batch produced.
    pub max_batch_len: usize,
    /// Time spent pulling from the input.
    pub exec_time: Duration,
}

impl fmt::Display for ComponentStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} rows read, {} rows in {} batches (max {}), {} metadata, {:?}",
            self.component,
            self.rows_read,
            self.rows_output,
            self.batches_output,
            self.max_batch_len,
            self.meta_observed,
            self.exec_time
        )
    }
}

/// An out-of-band message from a row producer.
#[derive(Debug)]
pub enum ProducerMetadata {
    /// The producer hit an error; no more rows follow.
    Error(NexusError),
    /// Progress marker used to verify row delivery.
    RowNum {
        /// Identifier of the sending component.
        sender_id: String,
        /// Number of rows sent so far.
        row_num: u64,
        /// Set on the sender's final message.
        last_msg: bool,
    },
    /// Read volume of a scan.
    Metrics {
        /// Bytes read from storage.
        bytes_read: u64,
        /// Rows read from storage.
        rows_read: u64,
    },
    /// Execution statistics of a component.
    ExecStats(ComponentStats),
    /// A notice to forward to the client.
    Notice(String),
}

impl ProducerMetadata {
    /// Returns the carried error, if this metadata is an error.
    pub fn err(&self) -> Option<&NexusError> {
        match self {
            ProducerMetadata::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if this metadata carries an error.
    pub fn is_error(&self) -> bool {
        self.err().is_some()
    }
}

impl From<NexusError> for ProducerMetadata {
    fn from(err: NexusError) -> Self {
        ProducerMetadata::Error(err)
    }
}

impl fmt::Display for ProducerMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProducerMetadata::Error(e) => write!(f, "error: {}", e),
            ProducerMetadata::RowNum {
                sender_id,
                row_num,
                last_msg,
            } => write!(f, "rownum {}@{} (last: {})", sender_id, row_num, last_msg),
            ProducerMetadata::Metrics {
                bytes_read,
                rows_read,
            } => write!(f, "metrics: {} bytes, {} rows", bytes_read, rows_read),
            ProducerMetadata::ExecStats(stats) => write!(f, "stats: {}", stats),
            ProducerMetadata::Notice(msg) => write!(f, "notice: {}", msg),
        }
    }
}

/// A component that accumulates metadata and hands it over on request.
pub trait MetadataSource {
    /// Returns all metadata accumulated so far. Must be called once the
    /// component is done producing; each item is returned exactly once.
    fn drain_meta(&mut self) -> Vec<ProducerMetadata>;
}
