//! Column batches for vectorized execution.
//!
//! A `Batch` stores a bounded number of rows in columnar format. Each column
//! is a `ColumnVector` whose storage is allocated once, at the batch's fixed
//! capacity, and then overwritten in place on every reuse. The logical
//! length of a batch says how many of those slots currently hold valid rows.

use std::fmt;

use nexus_common::{NexusError, NexusResult};

use crate::datum::Datum;
use crate::types::ColumnType;

/// Typed storage of a column vector.
#[derive(Debug, Clone, PartialEq)]
pub enum VecData {
    /// Boolean values.
    Bool(Vec<bool>),
    /// 16-bit integers.
    Int16(Vec<i16>),
    /// 32-bit integers.
    Int32(Vec<i32>),
    /// 64-bit integers.
    Int64(Vec<i64>),
    /// 64-bit floats.
    Float64(Vec<f64>),
    /// Scaled decimals.
    Decimal(Vec<i128>),
    /// Binary values.
    Bytes(Vec<Vec<u8>>),
    /// Text values.
    String(Vec<String>),
    /// Dates.
    Date(Vec<i32>),
    /// Timestamps.
    Timestamp(Vec<i64>),
}

impl VecData {
    fn with_capacity(typ: &ColumnType, capacity: usize) -> Self {
        match typ {
            ColumnType::Bool => VecData::Bool(vec![false; capacity]),
            ColumnType::Int16 => VecData::Int16(vec![0; capacity]),
            ColumnType::Int32 => VecData::Int32(vec![0; capacity]),
            ColumnType::Int64 => VecData::Int64(vec![0; capacity]),
            ColumnType::Float64 => VecData::Float64(vec![0.0; capacity]),
            ColumnType::Decimal { .. } => VecData::Decimal(vec![0; capacity]),
            ColumnType::Bytes => VecData::Bytes(vec![Vec::new(); capacity]),
            ColumnType::String => VecData::String(vec![String::new(); capacity]),
            ColumnType::Date => VecData::Date(vec![0; capacity]),
            ColumnType::Timestamp => VecData::Timestamp(vec![0; capacity]),
        }
    }
}

/// A fixed-capacity vector of values of a single type, with a null mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnVector {
    /// The type of this column.
    typ: ColumnType,
    /// The values.
    data: VecData,
    /// Null mask; `true` marks a NULL slot.
    nulls: Vec<bool>,
    /// Whether any slot may currently be NULL.
    maybe_has_nulls: bool,
}

impl ColumnVector {
    /// Creates a vector of the given type with `capacity` slots.
    pub fn new(typ: ColumnType, capacity: usize) -> Self {
        Self {
            typ,
            data: VecData::with_capacity(&typ, capacity),
            nulls: vec![false; capacity],
            maybe_has_nulls: false,
        }
    }

    /// Returns the type of this column.
    pub fn column_type(&self) -> &ColumnType {
        &self.typ
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.nulls.len()
    }

    /// Returns the typed storage.
    pub fn data(&self) -> &VecData {
        &self.data
    }

    /// Returns true if any slot may be NULL.
    pub fn maybe_has_nulls(&self) -> bool {
        self.maybe_has_nulls
    }

    /// Returns true if slot `idx` is NULL.
    pub fn is_null(&self, idx: usize) -> bool {
        self.nulls.get(idx).copied().unwrap_or(false)
    }

    /// Clears the null mask. Values are left in place to be overwritten.
    pub fn reset(&mut self) {
        if self.maybe_has_nulls {
            self.nulls.iter_mut().for_each(|n| *n = false);
            self.maybe_has_nulls = false;
        }
    }

    /// Stores `datum` in slot `idx`.
    pub fn set(&mut self, idx: usize, datum: Datum) -> NexusResult<()> {
        if idx >= self.capacity() {
            return Err(NexusError::internal(format!(
                "slot {} out of bounds for vector of capacity {}",
                idx,
                self.capacity()
            )));
        }
        if datum.is_null() {
            self.nulls[idx] = true;
            self.maybe_has_nulls = true;
            return Ok(());
        }
        self.nulls[idx] = false;

        match (&mut self.data, datum) {
            (VecData::Bool(v), Datum::Bool(b)) => v[idx] = b,
            (VecData::Int16(v), Datum::Int16(i)) => v[idx] = i,
            (VecData::Int32(v), Datum::Int32(i)) => v[idx] = i,
            (VecData::Int64(v), Datum::Int64(i)) => v[idx] = i,
            (VecData::Float64(v), Datum::Float64(f)) => v[idx] = f,
            (VecData::Decimal(v), Datum::Decimal { value, scale }) => {
                if !matches!(self.typ, ColumnType::Decimal { scale: s } if s == scale) {
                    return Err(NexusError::TypeMismatch {
                        expected: self.typ.to_string(),
                        actual: ColumnType::Decimal { scale }.to_string(),
                    });
                }
                v[idx] = value;
            }
            (VecData::Bytes(v), Datum::Bytes(b)) => v[idx] = b,
            (VecData::String(v), Datum::String(s)) => v[idx] = s,
            (VecData::Date(v), Datum::Date(d)) => v[idx] = d,
            (VecData::Timestamp(v), Datum::Timestamp(ts)) => v[idx] = ts,
            (_, other) => {
                return Err(NexusError::TypeMismatch {
                    expected: self.typ.to_string(),
                    actual: other
                        .column_type()
                        .map_or_else(|| "NULL".to_string(), |t| t.to_string()),
                })
            }
        }
        Ok(())
    }

    /// Returns the value in slot `idx` as a datum.
    pub fn get(&self, idx: usize) -> Datum {
        if idx >= self.capacity() || self.nulls[idx] {
            return Datum::Null;
        }
        match &self.data {
            VecData::Bool(v) => Datum::Bool(v[idx]),
            VecData::Int16(v) => Datum::Int16(v[idx]),
            VecData::Int32(v) => Datum::Int32(v[idx]),
            VecData::Int64(v) => Datum::Int64(v[idx]),
            VecData::Float64(v) => Datum::Float64(v[idx]),
            VecData::Decimal(v) => match self.typ {
                ColumnType::Decimal { scale } => Datum::Decimal {
                    value: v[idx],
                    scale,
                },
                _ => Datum::Null,
            },
            VecData::Bytes(v) => Datum::Bytes(v[idx].clone()),
            VecData::String(v) => Datum::String(v[idx].clone()),
            VecData::Date(v) => Datum::Date(v[idx]),
            VecData::Timestamp(v) => Datum::Timestamp(v[idx]),
        }
    }

    /// Returns the estimated memory footprint in bytes.
    pub fn memory_size(&self) -> usize {
        vector_memory_size(&self.typ, self.capacity())
    }
}

/// Returns the estimated footprint of a vector of type `typ` with
/// `capacity` slots.
pub fn vector_memory_size(typ: &ColumnType, capacity: usize) -> usize {
    capacity * (typ.estimated_width() + 1)
}

/// A bounded batch of rows in columnar format.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// One vector per output column.
    cols: Vec<ColumnVector>,
    /// Number of valid rows.
    length: usize,
    /// Number of slots in every vector.
    capacity: usize,
}

impl Batch {
    /// Creates a batch of the given types with fixed `capacity`.
    pub fn new(typs: &[ColumnType], capacity: usize) -> Self {
        Self {
            cols: typs
                .iter()
                .map(|t| ColumnVector::new(*t, capacity))
                .collect(),
            length: 0,
            capacity,
        }
    }

    /// Returns the number of slots in this batch.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of valid rows.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Returns true if this batch holds no rows. A zero-length batch
    /// returned by an operator signals the end of its output.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Sets the number of valid rows.
    ///
    /// # Panics
    ///
    /// Panics if `length` exceeds the capacity.
    pub fn set_length(&mut self, length: usize) {
        assert!(
            length <= self.capacity,
            "batch length {} exceeds capacity {}",
            length,
            self.capacity
        );
        self.length = length;
    }

    /// Returns the number of columns.
    pub fn width(&self) -> usize {
        self.cols.len()
    }

    /// Returns the column types.
    pub fn types(&self) -> Vec<ColumnType> {
        self.cols.iter().map(|c| *c.column_type()).collect()
    }

    /// Returns the vector for column `idx`.
    pub fn col_vec(&self, idx: usize) -> Option<&ColumnVector> {
        self.cols.get(idx)
    }

    /// Returns the vector for column `idx` mutably.
    pub fn col_vec_mut(&mut self, idx: usize) -> Option<&mut ColumnVector> {
        self.cols.get_mut(idx)
    }

    /// Resets the batch for reuse: zero length, nulls cleared, storage kept.
    pub fn reset_internal_batch(&mut self) {
        self.length = 0;
        for col in &mut self.cols {
            col.reset();
        }
    }

    /// Returns row `idx` as datums, if it is within the valid length.
    pub fn row(&self, idx: usize) -> Option<Vec<Datum>> {
        if idx >= self.length {
            return None;
        }
        Some(self.cols.iter().map(|c| c.get(idx)).collect())
    }

    /// Returns an iterator over the valid rows.
    pub fn rows(&self) -> impl Iterator<Item = Vec<Datum>> + '_ {
        (0..self.length).map(move |i| self.cols.iter().map(|c| c.get(i)).collect())
    }

    /// Returns the estimated memory footprint in bytes.
    pub fn memory_size(&self) -> usize {
        self.cols.iter().map(ColumnVector::memory_size).sum()
    }
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Batch ({} rows x {} cols, capacity {})",
            self.length,
            self.width(),
            self.capacity
        )?;

        // Data (limit to 10 rows for display)
        for row in self.rows().take(10) {
            for (j, datum) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, " | ")?;
                }
                write!(f, "{}", datum)?;
            }
            writeln!(f)?;
        }

        if self.length > 10 {
            writeln!(f, "... ({} more rows)", self.length - 10)?;
        }

        Ok(())
    }
}

/// Returns the estimated footprint of a batch of `typs` with `capacity`
/// slots per column.
pub fn batch_memory_size(typs: &[ColumnType], capacity: usize) -> usize {
    typs.iter().map(|t| vector_memory_size(t, capacity)).sum()
}
