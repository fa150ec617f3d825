//! Row staging buffer.
//!
//! A `RowBuffer` holds the rows a columnarizer collects before converting
//! them to columns. Its length tracks the capacity of the batch it feeds and
//! only ever grows. Slots are scratch space: they are overwritten on every
//! fill, so content left over from a previous fill carries no meaning.

use crate::encoding::EncDatum;
use crate::row::EncDatumRow;

/// An owned, growable array of row slots.
#[derive(Debug, Default, Clone)]
pub struct RowBuffer {
    rows: Vec<EncDatumRow>,
}

impl RowBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the buffer has no slots.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Grows the buffer to `new_len` slots of `width` columns.
    ///
    /// Existing slots keep their storage; new slots are empty rows. A
    /// `new_len` at or below the current length is a no-op.
    pub fn grow_to(&mut self, new_len: usize, width: usize) {
        if new_len <= self.rows.len() {
            return;
        }
        self.rows.reserve_exact(new_len - self.rows.len());
        self.rows
            .resize_with(new_len, || EncDatumRow::with_width(width));
    }

    /// Copies `row` into slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is out of bounds.
    pub fn stage(&mut self, idx: usize, row: &[EncDatum]) {
        self.rows[idx].copy_from(row);
    }

    /// Returns slot `idx`.
    pub fn slot(&self, idx: usize) -> Option<&EncDatumRow> {
        self.rows.get(idx)
    }

    /// Returns the first `n` slots.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the buffer length.
    pub fn filled(&self, n: usize) -> &[EncDatumRow] {
        &self.rows[..n]
    }
}
