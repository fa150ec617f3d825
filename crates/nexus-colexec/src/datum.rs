//! Decoded runtime values.
//!
//! A `Datum` is a single SQL value in its decoded, in-memory form. Rows
//! carry datums lazily (see [`EncDatum`](crate::EncDatum)) and column
//! vectors store them unboxed by type.

use std::fmt;

use crate::types::ColumnType;

/// A decoded runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// Decimal value (stored as scaled integer).
    Decimal { value: i128, scale: u8 },
    /// Binary data.
    Bytes(Vec<u8>),
    /// String value.
    String(String),
    /// Date (days since epoch).
    Date(i32),
    /// Timestamp (microseconds since epoch).
    Timestamp(i64),
}

impl Datum {
    /// Creates a boolean datum.
    pub fn bool(v: bool) -> Self {
        Datum::Bool(v)
    }

    /// Creates a 32-bit integer datum.
    pub fn int(v: i32) -> Self {
        Datum::Int32(v)
    }

    /// Creates a 64-bit integer datum.
    pub fn bigint(v: i64) -> Self {
        Datum::Int64(v)
    }

    /// Creates a float datum.
    pub fn double(v: f64) -> Self {
        Datum::Float64(v)
    }

    /// Creates a string datum.
    pub fn string(v: impl Into<String>) -> Self {
        Datum::String(v.into())
    }

    /// Returns true if this datum is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns the column type of this datum, or `None` for NULL.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Datum::Null => None,
            Datum::Bool(_) => Some(ColumnType::Bool),
            Datum::Int16(_) => Some(ColumnType::Int16),
            Datum::Int32(_) => Some(ColumnType::Int32),
            Datum::Int64(_) => Some(ColumnType::Int64),
            Datum::Float64(_) => Some(ColumnType::Float64),
            Datum::Decimal { scale, .. } => Some(ColumnType::Decimal { scale: *scale }),
            Datum::Bytes(_) => Some(ColumnType::Bytes),
            Datum::String(_) => Some(ColumnType::String),
            Datum::Date(_) => Some(ColumnType::Date),
            Datum::Timestamp(_) => Some(ColumnType::Timestamp),
        }
    }

    /// Returns true if this datum can be stored in a column of type `typ`.
    /// NULL fits every type.
    pub fn fits(&self, typ: &ColumnType) -> bool {
        self.column_type().map_or(true, |t| t == *typ)
    }

    /// Returns a rough estimate of the memory held by this datum.
    pub fn size(&self) -> usize {
        let heap = match self {
            Datum::Bytes(b) => b.len(),
            Datum::String(s) => s.len(),
            _ => 0,
        };
        std::mem::size_of::<Datum>() + heap
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "NULL"),
            Datum::Bool(b) => write!(f, "{}", b),
            Datum::Int16(i) => write!(f, "{}", i),
            Datum::Int32(i) => write!(f, "{}", i),
            Datum::Int64(i) => write!(f, "{}", i),
            Datum::Float64(v) => write!(f, "{}", v),
            Datum::Decimal { value, scale } => {
                if *scale == 0 {
                    return write!(f, "{}", value);
                }
                let divisor = 10i128.pow(u32::from(*scale));
                let sign = if *value < 0 { "-" } else { "" };
                let abs = value.unsigned_abs();
                let divisor = divisor.unsigned_abs();
                write!(
                    f,
                    "{}{}.{:0width$}",
                    sign,
                    abs / divisor,
                    abs % divisor,
                    width = *scale as usize
                )
            }
            Datum::Bytes(b) => {
                write!(f, "\\x")?;
                for byte in b {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Datum::String(s) => write!(f, "{}", s),
            Datum::Date(d) => write!(f, "date:{}", d),
            Datum::Timestamp(ts) => write!(f, "ts:{}", ts),
        }
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Bool(v)
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int32(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Float64(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}
