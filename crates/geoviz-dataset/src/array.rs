//! Typed flat array buffers
//!
//! Provides [`DType`], [`Scalar`], and [`ArrayData`]: row-major element
//! storage for one variable, independent of any on-disk encoding.

use crate::error::DatasetError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// Element type of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Variable-length UTF-8 string
    String,
}

impl DType {
    /// Canonical lowercase name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
        }
    }

    /// Fixed element width in bytes, `None` for variable-length types
    #[must_use]
    pub const fn size_of(self) -> Option<usize> {
        match self {
            Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::String => None,
        }
    }

    /// Whether values convert to `f64` for range checks
    #[inline]
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::String)
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single value of some [`DType`]
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Scalar {
    /// Element type of this value
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(_) => DType::UInt16,
            Self::UInt32(_) => DType::UInt32,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
            Self::String(_) => DType::String,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
        }
    }
}

/// Applies `$body` to the inner vector of every variant
macro_rules! with_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ArrayData::Int8($values) => $body,
            ArrayData::Int16($values) => $body,
            ArrayData::Int32($values) => $body,
            ArrayData::Int64($values) => $body,
            ArrayData::UInt8($values) => $body,
            ArrayData::UInt16($values) => $body,
            ArrayData::UInt32($values) => $body,
            ArrayData::UInt64($values) => $body,
            ArrayData::Float32($values) => $body,
            ArrayData::Float64($values) => $body,
            ArrayData::String($values) => $body,
        }
    };
}

/// Like [`with_values`], rewrapping the result in the same variant
macro_rules! map_values {
    ($data:expr, $values:ident => $body:expr) => {
        match $data {
            ArrayData::Int8($values) => ArrayData::Int8($body),
            ArrayData::Int16($values) => ArrayData::Int16($body),
            ArrayData::Int32($values) => ArrayData::Int32($body),
            ArrayData::Int64($values) => ArrayData::Int64($body),
            ArrayData::UInt8($values) => ArrayData::UInt8($body),
            ArrayData::UInt16($values) => ArrayData::UInt16($body),
            ArrayData::UInt32($values) => ArrayData::UInt32($body),
            ArrayData::UInt64($values) => ArrayData::UInt64($body),
            ArrayData::Float32($values) => ArrayData::Float32($body),
            ArrayData::Float64($values) => ArrayData::Float64($body),
            ArrayData::String($values) => ArrayData::String($body),
        }
    };
}

/// Row-major element buffer of a single variable
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    UInt8(Vec<u8>),
    UInt16(Vec<u16>),
    UInt32(Vec<u32>),
    UInt64(Vec<u64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl ArrayData {
    /// Buffer of `len` copies of `value`
    #[must_use]
    pub fn full(value: &Scalar, len: usize) -> Self {
        match value {
            Scalar::Int8(v) => Self::Int8(vec![*v; len]),
            Scalar::Int16(v) => Self::Int16(vec![*v; len]),
            Scalar::Int32(v) => Self::Int32(vec![*v; len]),
            Scalar::Int64(v) => Self::Int64(vec![*v; len]),
            Scalar::UInt8(v) => Self::UInt8(vec![*v; len]),
            Scalar::UInt16(v) => Self::UInt16(vec![*v; len]),
            Scalar::UInt32(v) => Self::UInt32(vec![*v; len]),
            Scalar::UInt64(v) => Self::UInt64(vec![*v; len]),
            Scalar::Float32(v) => Self::Float32(vec![*v; len]),
            Scalar::Float64(v) => Self::Float64(vec![*v; len]),
            Scalar::String(v) => Self::String(vec![v.clone(); len]),
        }
    }

    /// Element type
    #[must_use]
    pub fn dtype(&self) -> DType {
        match self {
            Self::Int8(_) => DType::Int8,
            Self::Int16(_) => DType::Int16,
            Self::Int32(_) => DType::Int32,
            Self::Int64(_) => DType::Int64,
            Self::UInt8(_) => DType::UInt8,
            Self::UInt16(_) => DType::UInt16,
            Self::UInt32(_) => DType::UInt32,
            Self::UInt64(_) => DType::UInt64,
            Self::Float32(_) => DType::Float32,
            Self::Float64(_) => DType::Float64,
            Self::String(_) => DType::String,
        }
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    /// Whether the buffer holds no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Approximate in-memory payload size in bytes
    #[must_use]
    pub fn nbytes(&self) -> usize {
        match self {
            Self::String(v) => v.iter().map(String::len).sum(),
            other => other.len() * other.dtype().size_of().unwrap_or(0),
        }
    }

    /// Contiguous slice of whole rows along the leading axis
    ///
    /// `row_len` is the number of elements per leading index. With
    /// `row_len == 0` the buffer holds no elements and cannot bound `rows`;
    /// the result is empty and the caller checks the leading dimension.
    ///
    /// # Errors
    /// Returns [`DatasetError::RangeOutOfBounds`] when `rows` exceeds the buffer.
    pub fn slice_rows(&self, row_len: usize, rows: Range<usize>) -> Result<Self, DatasetError> {
        let row_count = if row_len == 0 { usize::MAX } else { self.len() / row_len };
        if rows.start > rows.end || rows.end > row_count {
            return Err(DatasetError::RangeOutOfBounds {
                start: rows.start,
                end: rows.end,
                len: row_count,
            });
        }
        let span = rows.start * row_len..rows.end * row_len;
        Ok(map_values!(self, v => v[span.clone()].to_vec()))
    }

    /// Gathers the given rows (in order) along the leading axis
    ///
    /// Rows are unbounded when `row_len == 0`, as for [`slice_rows`](Self::slice_rows).
    ///
    /// # Errors
    /// Returns [`DatasetError::RangeOutOfBounds`] when any row index is too large.
    pub fn take_rows(&self, row_len: usize, rows: &[usize]) -> Result<Self, DatasetError> {
        let row_count = if row_len == 0 { usize::MAX } else { self.len() / row_len };
        if let Some(&bad) = rows.iter().find(|&&r| r >= row_count) {
            return Err(DatasetError::RangeOutOfBounds {
                start: bad,
                end: bad + 1,
                len: row_count,
            });
        }
        Ok(map_values!(self, v => rows
            .iter()
            .flat_map(|&r| v[r * row_len..(r + 1) * row_len].iter().cloned())
            .collect()))
    }

    /// Append the elements of `other`, which must have the same type
    ///
    /// # Errors
    /// Returns [`DatasetError::DTypeMismatch`] when the element types differ.
    pub fn append(&mut self, other: Self) -> Result<(), DatasetError> {
        match (self, other) {
            (Self::Int8(a), Self::Int8(b)) => a.extend(b),
            (Self::Int16(a), Self::Int16(b)) => a.extend(b),
            (Self::Int32(a), Self::Int32(b)) => a.extend(b),
            (Self::Int64(a), Self::Int64(b)) => a.extend(b),
            (Self::UInt8(a), Self::UInt8(b)) => a.extend(b),
            (Self::UInt16(a), Self::UInt16(b)) => a.extend(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.extend(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.extend(b),
            (Self::Float32(a), Self::Float32(b)) => a.extend(b),
            (Self::Float64(a), Self::Float64(b)) => a.extend(b),
            (Self::String(a), Self::String(b)) => a.extend(b),
            (this, other) => {
                return Err(DatasetError::DTypeMismatch {
                    expected: this.dtype(),
                    actual: other.dtype(),
                })
            }
        }
        Ok(())
    }

    /// Empty buffer of the given type
    #[must_use]
    pub fn empty(dtype: DType) -> Self {
        match dtype {
            DType::Int8 => Self::Int8(Vec::new()),
            DType::Int16 => Self::Int16(Vec::new()),
            DType::Int32 => Self::Int32(Vec::new()),
            DType::Int64 => Self::Int64(Vec::new()),
            DType::UInt8 => Self::UInt8(Vec::new()),
            DType::UInt16 => Self::UInt16(Vec::new()),
            DType::UInt32 => Self::UInt32(Vec::new()),
            DType::UInt64 => Self::UInt64(Vec::new()),
            DType::Float32 => Self::Float32(Vec::new()),
            DType::Float64 => Self::Float64(Vec::new()),
            DType::String => Self::String(Vec::new()),
        }
    }

    /// Lossy numeric view used for range checks; `None` for strings
    #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
    #[must_use]
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        let out = match self {
            Self::Int8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::UInt8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::UInt16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::UInt32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::UInt64(v) => v.iter().map(|&x| x as f64).collect(),
            Self::Float32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Float64(v) => v.clone(),
            Self::String(_) => return None,
        };
        Some(out)
    }

    /// Element at a flat index, as a [`Scalar`]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Scalar> {
        match self {
            Self::Int8(v) => v.get(index).map(|&x| Scalar::Int8(x)),
            Self::Int16(v) => v.get(index).map(|&x| Scalar::Int16(x)),
            Self::Int32(v) => v.get(index).map(|&x| Scalar::Int32(x)),
            Self::Int64(v) => v.get(index).map(|&x| Scalar::Int64(x)),
            Self::UInt8(v) => v.get(index).map(|&x| Scalar::UInt8(x)),
            Self::UInt16(v) => v.get(index).map(|&x| Scalar::UInt16(x)),
            Self::UInt32(v) => v.get(index).map(|&x| Scalar::UInt32(x)),
            Self::UInt64(v) => v.get(index).map(|&x| Scalar::UInt64(x)),
            Self::Float32(v) => v.get(index).map(|&x| Scalar::Float32(x)),
            Self::Float64(v) => v.get(index).map(|&x| Scalar::Float64(x)),
            Self::String(v) => v.get(index).map(|x| Scalar::String(x.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_has_requested_length_and_type() {
        let data = ArrayData::full(&Scalar::Float32(0.02), 6);
        assert_eq!(data.len(), 6);
        assert_eq!(data.dtype(), DType::Float32);
        assert_eq!(data.get(5), Some(Scalar::Float32(0.02)));
    }

    #[test]
    fn slice_rows_keeps_whole_rows() {
        // 3 rows x 2 columns
        let data = ArrayData::Int32(vec![0, 1, 10, 11, 20, 21]);
        let sliced = data.slice_rows(2, 1..3).unwrap();
        assert_eq!(sliced, ArrayData::Int32(vec![10, 11, 20, 21]));
    }

    #[test]
    fn slice_rows_rejects_overrun() {
        let data = ArrayData::UInt8(vec![0; 4]);
        assert!(matches!(
            data.slice_rows(2, 1..3),
            Err(DatasetError::RangeOutOfBounds { len: 2, .. })
        ));
    }

    #[test]
    fn zero_length_rows_slice_to_empty() {
        let data = ArrayData::Float32(Vec::new());
        assert_eq!(data.slice_rows(0, 1..3).unwrap(), ArrayData::Float32(Vec::new()));
        assert_eq!(data.take_rows(0, &[4, 1]).unwrap(), ArrayData::Float32(Vec::new()));
    }

    #[test]
    fn take_rows_gathers_in_order() {
        let data = ArrayData::String(
            ["a0", "a1", "b0", "b1", "c0", "c1"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        );
        let taken = data.take_rows(2, &[2, 0]).unwrap();
        assert_eq!(
            taken,
            ArrayData::String(vec![
                "c0".to_string(),
                "c1".to_string(),
                "a0".to_string(),
                "a1".to_string()
            ])
        );
    }

    #[test]
    fn to_f64_skips_strings() {
        assert!(ArrayData::String(vec![]).to_f64().is_none());
        assert_eq!(
            ArrayData::Int16(vec![-3, 4]).to_f64(),
            Some(vec![-3.0, 4.0])
        );
    }

    #[test]
    fn nbytes_uses_element_width() {
        assert_eq!(ArrayData::Float64(vec![0.0; 3]).nbytes(), 24);
        assert_eq!(ArrayData::UInt8(vec![0; 3]).nbytes(), 3);
    }

    #[test]
    fn append_requires_same_dtype() {
        let mut data = ArrayData::empty(DType::Float32);
        data.append(ArrayData::Float32(vec![1.0, 2.0])).unwrap();
        assert_eq!(data.len(), 2);
        assert!(matches!(
            data.append(ArrayData::Float64(vec![1.0])),
            Err(DatasetError::DTypeMismatch { expected: DType::Float32, actual: DType::Float64 })
        ));
    }

    #[test]
    fn scalar_display() {
        assert_eq!(Scalar::String("oil".to_string()).to_string(), "oil");
        assert_eq!(Scalar::UInt8(0).to_string(), "0");
    }
}
