//! Row-to-vector conversion.

use nexus_common::{NexusError, NexusResult};

use crate::batch::ColumnVector;
use crate::datum::Datum;
use crate::row::EncDatumRow;
use crate::types::ColumnType;

/// Scratch space for decoding a column's worth of datums.
///
/// `alloc_size` is a sizing hint: the scratch buffer always reserves room
/// for at least that many datums, so callers that know how many rows they
/// typically convert can avoid regrowing it.
#[derive(Debug, Default)]
pub struct DatumAlloc {
    /// Minimum number of datums to reserve.
    pub alloc_size: usize,
    scratch: Vec<Datum>,
}

impl DatumAlloc {
    /// Creates an allocator with the given hint.
    pub fn with_alloc_size(alloc_size: usize) -> Self {
        Self {
            alloc_size,
            scratch: Vec::with_capacity(alloc_size),
        }
    }

    /// Returns how many datums the scratch buffer can hold without growing.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.capacity()
    }

    fn take_scratch(&mut self, n: usize) -> Vec<Datum> {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.clear();
        let want = n.max(self.alloc_size);
        if scratch.capacity() < want {
            scratch.reserve(want);
        }
        scratch
    }
}

/// Decodes column `col_idx` of every row in `rows` and writes the values
/// into slots `0..rows.len()` of `vec`.
///
/// Fails if a value cannot be decoded or does not match `typ`.
pub fn enc_datum_rows_to_col_vec(
    rows: &[EncDatumRow],
    vec: &mut ColumnVector,
    col_idx: usize,
    typ: &ColumnType,
    alloc: &mut DatumAlloc,
) -> NexusResult<()> {
    if vec.column_type() != typ {
        return Err(NexusError::TypeMismatch {
            expected: typ.to_string(),
            actual: vec.column_type().to_string(),
        });
    }
    if rows.len() > vec.capacity() {
        return Err(NexusError::internal(format!(
            "{} rows do not fit in a vector of capacity {}",
            rows.len(),
            vec.capacity()
        )));
    }

    let mut scratch = alloc.take_scratch(rows.len());
    let result = decode_column(rows, col_idx, typ, &mut scratch).and_then(|()| {
        for (idx, datum) in scratch.drain(..).enumerate() {
            vec.set(idx, datum)?;
        }
        Ok(())
    });
    alloc.scratch = scratch;
    result
}

fn decode_column(
    rows: &[EncDatumRow],
    col_idx: usize,
    typ: &ColumnType,
    out: &mut Vec<Datum>,
) -> NexusResult<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        let enc = row.get(col_idx).ok_or_else(|| {
            NexusError::internal(format!(
                "row {} has {} columns, column {} requested",
                row_idx,
                row.num_columns(),
                col_idx
            ))
        })?;
        out.push(enc.to_datum(typ)?);
    }
    Ok(())
}
