//! Row representation for row-at-a-time execution.
//!
//! This module defines the `EncDatumRow` type which holds one row of
//! possibly-encoded values as produced by a row source.

use std::fmt;

use crate::datum::Datum;
use crate::encoding::EncDatum;

/// A single row of possibly-encoded values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncDatumRow {
    /// The values in this row.
    values: Vec<EncDatum>,
}

impl EncDatumRow {
    /// Creates a new row with the given values.
    pub fn new(values: Vec<EncDatum>) -> Self {
        Self { values }
    }

    /// Creates a row of `width` unset slots.
    pub fn with_width(width: usize) -> Self {
        Self {
            values: vec![EncDatum::default(); width],
        }
    }

    /// Creates a row from decoded datums.
    pub fn from_datums(datums: impl IntoIterator<Item = Datum>) -> Self {
        Self {
            values: datums.into_iter().map(EncDatum::from_datum).collect(),
        }
    }

    /// Returns the number of columns in this row.
    pub fn num_columns(&self) -> usize {
        self.values.len()
    }

    /// Returns true if this row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value at the given index.
    pub fn get(&self, index: usize) -> Option<&EncDatum> {
        self.values.get(index)
    }

    /// Returns a mutable reference to the value at the given index.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut EncDatum> {
        self.values.get_mut(index)
    }

    /// Returns the values as a slice.
    pub fn values(&self) -> &[EncDatum] {
        &self.values
    }

    /// Overwrites this row with a copy of `src`, reusing the existing
    /// allocation where possible.
    pub fn copy_from(&mut self, src: &[EncDatum]) {
        self.values.truncate(src.len());
        let (head, tail) = src.split_at(self.values.len());
        self.values.clone_from_slice(head);
        self.values.extend_from_slice(tail);
    }

    /// Consumes the row and returns the values.
    pub fn into_values(self) -> Vec<EncDatum> {
        self.values
    }
}

impl From<Vec<EncDatum>> for EncDatumRow {
    fn from(values: Vec<EncDatum>) -> Self {
        Self::new(values)
    }
}

impl fmt::Display for EncDatumRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match (value.datum(), value.encoded()) {
                (Some(d), _) => write!(f, "{}", d)?,
                (None, Some(bytes)) => write!(f, "<{} encoded bytes>", bytes.len())?,
                (None, None) => write!(f, "<unset>")?,
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_width() {
        let row = EncDatumRow::with_width(3);
        assert_eq!(row.num_columns(), 3);
        assert!(row.values().iter().all(EncDatum::is_unset));
    }

    #[test]
    fn test_copy_from_reuses_slot() {
        let mut slot = EncDatumRow::with_width(2);
        let src = EncDatumRow::from_datums([Datum::int(1), Datum::string("a")]);
        slot.copy_from(src.values());
        assert_eq!(slot, src);

        let shorter = EncDatumRow::from_datums([Datum::int(9)]);
        slot.copy_from(shorter.values());
        assert_eq!(slot, shorter);
    }

    #[test]
    fn test_display() {
        let row = EncDatumRow::new(vec![
            EncDatum::from_datum(Datum::int(1)),
            EncDatum::encode(&Datum::int(2)),
            EncDatum::default(),
        ]);
        assert_eq!(row.to_string(), "(1, <5 encoded bytes>, <unset>)");
    }
}
