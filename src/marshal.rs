//! Marshalling strategies: how a typed element becomes cell bytes.
//!
//! The ring never interprets cell contents itself; it hands the cell to a
//! [`Marshal`] implementation. [`RawBytes`] copies fixed-length byte
//! strings verbatim, [`StructLayout`] packs an ordered tuple of
//! fixed-width numeric fields little-endian. New encodings plug in at the
//! same seam without touching the index logic.

use bytes::{Buf, BufMut, Bytes};

use crate::error::ConfigError;

/// Converts elements to and from fixed-size cell bytes.
///
/// Implementations must validate the element fully before touching the
/// cell: a failed `encode` leaves the cell bytes unchanged.
pub trait Marshal {
    type Element;

    /// Byte length of one cell.
    fn cell_size(&self) -> usize;

    /// Encode `element` into `cell`. `cell.len()` equals `cell_size()`.
    fn encode(&self, element: &Self::Element, cell: &mut [u8]) -> Result<(), MarshalError>;

    /// Decode the element stored in `cell`.
    fn decode(&self, cell: &[u8]) -> Self::Element;
}

/// Verbatim byte copy: elements are byte strings of exactly `cell_size`.
#[derive(Debug, Clone, Copy)]
pub struct RawBytes {
    cell_size: usize,
}

impl RawBytes {
    pub fn new(cell_size: usize) -> Self {
        Self { cell_size }
    }
}

impl Marshal for RawBytes {
    type Element = Bytes;

    #[inline]
    fn cell_size(&self) -> usize {
        self.cell_size
    }

    fn encode(&self, element: &Bytes, cell: &mut [u8]) -> Result<(), MarshalError> {
        if element.len() != self.cell_size {
            return Err(MarshalError::SizeMismatch {
                len: element.len(),
                expected: self.cell_size,
            });
        }
        cell.copy_from_slice(element);
        Ok(())
    }

    fn decode(&self, cell: &[u8]) -> Bytes {
        Bytes::copy_from_slice(cell)
    }
}

/// Fixed-width numeric field kinds for [`StructLayout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl FieldKind {
    /// Packed width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }
}

/// A single field value carried by a structured element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Value {
    /// The field kind this value packs as.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::I8(_) => FieldKind::I8,
            Self::U8(_) => FieldKind::U8,
            Self::I16(_) => FieldKind::I16,
            Self::U16(_) => FieldKind::U16,
            Self::I32(_) => FieldKind::I32,
            Self::U32(_) => FieldKind::U32,
            Self::I64(_) => FieldKind::I64,
            Self::U64(_) => FieldKind::U64,
            Self::F32(_) => FieldKind::F32,
            Self::F64(_) => FieldKind::F64,
        }
    }
}

/// Packs an ordered tuple of fixed-width numeric fields, little-endian.
///
/// The cell size is the summed width of the descriptor; there is no
/// padding between fields.
#[derive(Debug, Clone)]
pub struct StructLayout {
    fields: Vec<FieldKind>,
    cell_size: usize,
}

impl StructLayout {
    /// Build a layout from an ordered field descriptor.
    pub fn new(fields: Vec<FieldKind>) -> Result<Self, ConfigError> {
        if fields.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        let cell_size = fields.iter().map(|field| field.width()).sum();
        Ok(Self { fields, cell_size })
    }

    /// The ordered field descriptor.
    pub fn fields(&self) -> &[FieldKind] {
        &self.fields
    }
}

impl Marshal for StructLayout {
    type Element = Vec<Value>;

    #[inline]
    fn cell_size(&self) -> usize {
        self.cell_size
    }

    fn encode(&self, element: &Vec<Value>, cell: &mut [u8]) -> Result<(), MarshalError> {
        if element.len() != self.fields.len() {
            return Err(MarshalError::FieldCount {
                found: element.len(),
                expected: self.fields.len(),
            });
        }
        // Validate every field before packing the first byte.
        for (index, (value, kind)) in element.iter().zip(&self.fields).enumerate() {
            if value.kind() != *kind {
                return Err(MarshalError::FieldType {
                    index,
                    expected: *kind,
                    found: value.kind(),
                });
            }
        }

        let mut cell = cell;
        for value in element {
            match *value {
                Value::I8(v) => cell.put_i8(v),
                Value::U8(v) => cell.put_u8(v),
                Value::I16(v) => cell.put_i16_le(v),
                Value::U16(v) => cell.put_u16_le(v),
                Value::I32(v) => cell.put_i32_le(v),
                Value::U32(v) => cell.put_u32_le(v),
                Value::I64(v) => cell.put_i64_le(v),
                Value::U64(v) => cell.put_u64_le(v),
                Value::F32(v) => cell.put_f32_le(v),
                Value::F64(v) => cell.put_f64_le(v),
            }
        }
        Ok(())
    }

    fn decode(&self, cell: &[u8]) -> Vec<Value> {
        let mut cell = cell;
        self.fields
            .iter()
            .map(|kind| match kind {
                FieldKind::I8 => Value::I8(cell.get_i8()),
                FieldKind::U8 => Value::U8(cell.get_u8()),
                FieldKind::I16 => Value::I16(cell.get_i16_le()),
                FieldKind::U16 => Value::U16(cell.get_u16_le()),
                FieldKind::I32 => Value::I32(cell.get_i32_le()),
                FieldKind::U32 => Value::U32(cell.get_u32_le()),
                FieldKind::I64 => Value::I64(cell.get_i64_le()),
                FieldKind::U64 => Value::U64(cell.get_u64_le()),
                FieldKind::F32 => Value::F32(cell.get_f32_le()),
                FieldKind::F64 => Value::F64(cell.get_f64_le()),
            })
            .collect()
    }
}

/// Errors from encoding an element into a cell.
///
/// A marshal error never advances the ring indices and never writes cell
/// bytes; it is distinct from a full ring, which is signaled through the
/// push result instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarshalError {
    /// Raw payload length does not match the cell size.
    SizeMismatch { len: usize, expected: usize },
    /// Structured element arity does not match the descriptor.
    FieldCount { found: usize, expected: usize },
    /// Structured element field kind does not match the descriptor.
    FieldType {
        index: usize,
        expected: FieldKind,
        found: FieldKind,
    },
}

impl std::fmt::Display for MarshalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SizeMismatch { len, expected } => {
                write!(f, "payload is {} bytes, cell size is {}", len, expected)
            }
            Self::FieldCount { found, expected } => {
                write!(f, "element has {} fields, layout has {}", found, expected)
            }
            Self::FieldType {
                index,
                expected,
                found,
            } => {
                write!(
                    f,
                    "field {} is {:?}, layout expects {:?}",
                    index, found, expected
                )
            }
        }
    }
}

impl std::error::Error for MarshalError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn raw_rejects_mismatched_length() {
        let raw = RawBytes::new(4);
        let mut cell = [0u8; 4];
        let err = raw
            .encode(&Bytes::from_static(b"00005"), &mut cell)
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::SizeMismatch {
                len: 5,
                expected: 4
            }
        );
        assert_eq!(cell, [0; 4]);
    }

    #[test]
    fn raw_round_trip() {
        let raw = RawBytes::new(4);
        let mut cell = [0u8; 4];
        raw.encode(&Bytes::from_static(b"abcd"), &mut cell).unwrap();
        assert_eq!(raw.decode(&cell), Bytes::from_static(b"abcd"));
    }

    #[test]
    fn layout_cell_size_is_summed_width() {
        let layout =
            StructLayout::new(vec![FieldKind::I32, FieldKind::I32, FieldKind::I32]).unwrap();
        assert_eq!(layout.cell_size(), 12);

        let mixed = StructLayout::new(vec![FieldKind::U8, FieldKind::I16, FieldKind::F64]).unwrap();
        assert_eq!(mixed.cell_size(), 11);
    }

    #[test]
    fn empty_layout_rejected() {
        assert!(matches!(
            StructLayout::new(vec![]),
            Err(ConfigError::EmptyLayout)
        ));
    }

    #[test]
    fn fields_pack_little_endian() {
        let layout = StructLayout::new(vec![FieldKind::I16, FieldKind::U8]).unwrap();
        let mut cell = [0u8; 3];
        layout
            .encode(&vec![Value::I16(0x0102), Value::U8(3)], &mut cell)
            .unwrap();
        assert_eq!(cell, [0x02, 0x01, 0x03]);
    }

    #[test]
    fn struct_round_trip() {
        let layout = StructLayout::new(vec![
            FieldKind::I32,
            FieldKind::U64,
            FieldKind::F64,
            FieldKind::I8,
        ])
        .unwrap();
        let element = vec![
            Value::I32(-7),
            Value::U64(u64::MAX),
            Value::F64(0.5),
            Value::I8(-1),
        ];
        let mut cell = vec![0u8; layout.cell_size()];
        layout.encode(&element, &mut cell).unwrap();
        assert_eq!(layout.decode(&cell), element);
    }

    #[test]
    fn arity_mismatch_rejected_up_front() {
        let layout = StructLayout::new(vec![FieldKind::I32, FieldKind::I32]).unwrap();
        let mut cell = [0xffu8; 8];
        let err = layout.encode(&vec![Value::I32(1)], &mut cell).unwrap_err();
        assert_eq!(
            err,
            MarshalError::FieldCount {
                found: 1,
                expected: 2
            }
        );
        assert_eq!(cell, [0xff; 8]);
    }

    #[test]
    fn field_type_mismatch_names_the_field() {
        let layout = StructLayout::new(vec![FieldKind::I32, FieldKind::U16]).unwrap();
        let mut cell = [0xffu8; 6];
        let err = layout
            .encode(&vec![Value::I32(1), Value::I16(2)], &mut cell)
            .unwrap_err();
        assert_eq!(
            err,
            MarshalError::FieldType {
                index: 1,
                expected: FieldKind::U16,
                found: FieldKind::I16,
            }
        );
        // Validation happens before any byte is packed.
        assert_eq!(cell, [0xff; 6]);
    }
}
