//! Column types.
//!
//! This module defines the physical types a column vector can hold.

use std::fmt;

use nexus_common::VARLEN_VALUE_OVERHEAD;

/// Physical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Boolean type.
    Bool,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Decimal stored as a scaled 128-bit integer.
    Decimal {
        /// Digits after the decimal point.
        scale: u8,
    },
    /// Binary data.
    Bytes,
    /// UTF-8 text.
    String,
    /// Date (days since epoch).
    Date,
    /// Timestamp (microseconds since epoch).
    Timestamp,
}

impl ColumnType {
    /// Returns the in-memory width of one value in bytes, or `None` for
    /// variable-width types.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            ColumnType::Bool => Some(1),
            ColumnType::Int16 => Some(2),
            ColumnType::Int32 | ColumnType::Date => Some(4),
            ColumnType::Int64 | ColumnType::Float64 | ColumnType::Timestamp => Some(8),
            ColumnType::Decimal { .. } => Some(16),
            ColumnType::Bytes | ColumnType::String => None,
        }
    }

    /// Returns the estimated memory footprint of one value in bytes.
    pub fn estimated_width(&self) -> usize {
        self.fixed_width().unwrap_or(VARLEN_VALUE_OVERHEAD)
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ColumnType::Int16
                | ColumnType::Int32
                | ColumnType::Int64
                | ColumnType::Float64
                | ColumnType::Decimal { .. }
        )
    }

    /// Returns true if this type is variable-width.
    pub fn is_varlen(&self) -> bool {
        self.fixed_width().is_none()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Bool => write!(f, "BOOL"),
            ColumnType::Int16 => write!(f, "INT2"),
            ColumnType::Int32 => write!(f, "INT4"),
            ColumnType::Int64 => write!(f, "INT8"),
            ColumnType::Float64 => write!(f, "FLOAT8"),
            ColumnType::Decimal { scale } => write!(f, "DECIMAL(,{})", scale),
            ColumnType::Bytes => write!(f, "BYTES"),
            ColumnType::String => write!(f, "STRING"),
            ColumnType::Date => write!(f, "DATE"),
            ColumnType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

/// Returns the estimated memory footprint of one row of the given types.
pub fn estimated_row_width(typs: &[ColumnType]) -> usize {
    typs.iter().map(ColumnType::estimated_width).sum()
}
