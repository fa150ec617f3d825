//! Value encoding for row-oriented data.
//!
//! Rows flowing out of row-at-a-time processors carry their values as
//! [`EncDatum`]s: either already decoded, or still in the compact value
//! encoding they were read or received in. Decoding happens lazily, once
//! the consumer knows the column type it expects.
//!
//! # Encoding Format
//!
//! Each value is a type tag (1 byte) followed by a payload:
//! - fixed-width types: the value in little-endian byte order
//! - decimal: the scaled integer (16 bytes) followed by the scale (1 byte)
//! - bytes and strings: length (4 bytes, little-endian) + data
//!
//! NULL is the bare tag with no payload.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use nexus_common::{NexusError, NexusResult};

use crate::datum::Datum;
use crate::types::ColumnType;

/// Type tags for value encoding.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeTag {
    Null = 0,
    Bool = 1,
    Int16 = 2,
    Int32 = 3,
    Int64 = 4,
    Float64 = 5,
    Decimal = 6,
    Bytes = 7,
    String = 8,
    Date = 9,
    Timestamp = 10,
}

impl TypeTag {
    fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(TypeTag::Null),
            1 => Some(TypeTag::Bool),
            2 => Some(TypeTag::Int16),
            3 => Some(TypeTag::Int32),
            4 => Some(TypeTag::Int64),
            5 => Some(TypeTag::Float64),
            6 => Some(TypeTag::Decimal),
            7 => Some(TypeTag::Bytes),
            8 => Some(TypeTag::String),
            9 => Some(TypeTag::Date),
            10 => Some(TypeTag::Timestamp),
            _ => None,
        }
    }
}

/// Appends the value encoding of `datum` to `buf`.
pub fn encode_value(datum: &Datum, buf: &mut BytesMut) {
    match datum {
        Datum::Null => buf.put_u8(TypeTag::Null as u8),
        Datum::Bool(b) => {
            buf.put_u8(TypeTag::Bool as u8);
            buf.put_u8(u8::from(*b));
        }
        Datum::Int16(i) => {
            buf.put_u8(TypeTag::Int16 as u8);
            buf.put_i16_le(*i);
        }
        Datum::Int32(i) => {
            buf.put_u8(TypeTag::Int32 as u8);
            buf.put_i32_le(*i);
        }
        Datum::Int64(i) => {
            buf.put_u8(TypeTag::Int64 as u8);
            buf.put_i64_le(*i);
        }
        Datum::Float64(f) => {
            buf.put_u8(TypeTag::Float64 as u8);
            buf.put_f64_le(*f);
        }
        Datum::Decimal { value, scale } => {
            buf.put_u8(TypeTag::Decimal as u8);
            buf.put_i128_le(*value);
            buf.put_u8(*scale);
        }
        Datum::Bytes(b) => {
            buf.put_u8(TypeTag::Bytes as u8);
            buf.put_u32_le(b.len() as u32);
            buf.put_slice(b);
        }
        Datum::String(s) => {
            buf.put_u8(TypeTag::String as u8);
            buf.put_u32_le(s.len() as u32);
            buf.put_slice(s.as_bytes());
        }
        Datum::Date(d) => {
            buf.put_u8(TypeTag::Date as u8);
            buf.put_i32_le(*d);
        }
        Datum::Timestamp(ts) => {
            buf.put_u8(TypeTag::Timestamp as u8);
            buf.put_i64_le(*ts);
        }
    }
}

fn need(bytes: &[u8], n: usize, what: &str) -> NexusResult<()> {
    if bytes.len() < n {
        return Err(NexusError::encoding(format!(
            "truncated {what}: need {n} bytes, have {}",
            bytes.len()
        )));
    }
    Ok(())
}

/// Decodes one value from the front of `bytes`, returning the datum and the
/// number of bytes consumed.
pub fn decode_value(mut bytes: &[u8]) -> NexusResult<(Datum, usize)> {
    let total = bytes.len();
    need(bytes, 1, "type tag")?;
    let raw_tag = bytes.get_u8();
    let tag = TypeTag::from_u8(raw_tag)
        .ok_or_else(|| NexusError::encoding(format!("unknown type tag: {raw_tag}")))?;

    let datum = match tag {
        TypeTag::Null => Datum::Null,
        TypeTag::Bool => {
            need(bytes, 1, "bool")?;
            Datum::Bool(bytes.get_u8() != 0)
        }
        TypeTag::Int16 => {
            need(bytes, 2, "int16")?;
            Datum::Int16(bytes.get_i16_le())
        }
        TypeTag::Int32 => {
            need(bytes, 4, "int32")?;
            Datum::Int32(bytes.get_i32_le())
        }
        TypeTag::Int64 => {
            need(bytes, 8, "int64")?;
            Datum::Int64(bytes.get_i64_le())
        }
        TypeTag::Float64 => {
            need(bytes, 8, "float64")?;
            Datum::Float64(bytes.get_f64_le())
        }
        TypeTag::Decimal => {
            need(bytes, 17, "decimal")?;
            let value = bytes.get_i128_le();
            let scale = bytes.get_u8();
            Datum::Decimal { value, scale }
        }
        TypeTag::Bytes | TypeTag::String => {
            need(bytes, 4, "length prefix")?;
            let len = bytes.get_u32_le() as usize;
            need(bytes, len, "payload")?;
            let payload = bytes[..len].to_vec();
            bytes.advance(len);
            if tag == TypeTag::Bytes {
                Datum::Bytes(payload)
            } else {
                Datum::String(String::from_utf8(payload).map_err(|e| {
                    NexusError::encoding(format!("invalid UTF-8 in string value: {e}"))
                })?)
            }
        }
        TypeTag::Date => {
            need(bytes, 4, "date")?;
            Datum::Date(bytes.get_i32_le())
        }
        TypeTag::Timestamp => {
            need(bytes, 8, "timestamp")?;
            Datum::Timestamp(bytes.get_i64_le())
        }
    };

    Ok((datum, total - bytes.len()))
}

/// A row value that may still be in its encoded form.
///
/// An `EncDatum` with neither an encoding nor a decoded datum is an empty
/// slot, as found in a freshly allocated row buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncDatum {
    encoded: Option<Bytes>,
    datum: Option<Datum>,
}

impl EncDatum {
    /// Creates an already-decoded value.
    pub fn from_datum(datum: Datum) -> Self {
        Self {
            encoded: None,
            datum: Some(datum),
        }
    }

    /// Creates a value from its encoding. Decoding is deferred.
    pub fn from_encoded(encoded: Bytes) -> Self {
        Self {
            encoded: Some(encoded),
            datum: None,
        }
    }

    /// Encodes `datum` eagerly and wraps the result.
    pub fn encode(datum: &Datum) -> Self {
        let mut buf = BytesMut::with_capacity(16);
        encode_value(datum, &mut buf);
        Self::from_encoded(buf.freeze())
    }

    /// Creates a NULL value.
    pub fn null() -> Self {
        Self::from_datum(Datum::Null)
    }

    /// Returns true if this slot holds no value.
    pub fn is_unset(&self) -> bool {
        self.encoded.is_none() && self.datum.is_none()
    }

    /// Returns the encoded form, if present.
    pub fn encoded(&self) -> Option<&Bytes> {
        self.encoded.as_ref()
    }

    /// Returns the decoded form, if already decoded.
    pub fn datum(&self) -> Option<&Datum> {
        self.datum.as_ref()
    }

    /// Decodes this value in place (if needed) and checks that it is a
    /// valid value of type `typ`.
    pub fn ensure_decoded(&mut self, typ: &ColumnType) -> NexusResult<&Datum> {
        if self.datum.is_none() {
            let datum = self.decode(typ)?;
            self.datum = Some(datum);
        }
        let datum = self
            .datum
            .as_ref()
            .ok_or_else(|| NexusError::internal("datum missing after decode"))?;
        check_type(datum, typ)?;
        Ok(datum)
    }

    /// Returns the decoded value without caching it.
    pub fn to_datum(&self, typ: &ColumnType) -> NexusResult<Datum> {
        let datum = match &self.datum {
            Some(d) => d.clone(),
            None => self.decode(typ)?,
        };
        check_type(&datum, typ)?;
        Ok(datum)
    }

    fn decode(&self, typ: &ColumnType) -> NexusResult<Datum> {
        let encoded = self.encoded.as_ref().ok_or_else(|| {
            NexusError::encoding(format!("unset value where {typ} was expected"))
        })?;
        let (datum, consumed) = decode_value(encoded)?;
        if consumed != encoded.len() {
            return Err(NexusError::encoding(format!(
                "{} trailing bytes after {typ} value",
                encoded.len() - consumed
            )));
        }
        Ok(datum)
    }
}

fn check_type(datum: &Datum, typ: &ColumnType) -> NexusResult<()> {
    if datum.fits(typ) {
        return Ok(());
    }
    Err(NexusError::TypeMismatch {
        expected: typ.to_string(),
        actual: datum
            .column_type()
            .map_or_else(|| "NULL".to_string(), |t| t.to_string()),
    })
}

impl From<Datum> for EncDatum {
    fn from(datum: Datum) -> Self {
        Self::from_datum(datum)
    }
}
