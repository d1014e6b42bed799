//! Variable-length integers.
//!
//! Values are split into 7-bit groups, least significant group first. Every
//! byte except the last carries the continuation bit (`0x80`). Both types are
//! unsigned: VarInt spans `0..=u32::MAX` in at most 5 bytes, VarLong spans
//! `0..=u64::MAX` in at most 10 bytes.

use bytes::{BufMut, BytesMut};

use crate::core::WireType;
use crate::error::{ProtocolError, Result};

const SEGMENT_BITS: u8 = 0x7F;
const CONTINUE_BIT: u8 = 0x80;

/// Maximum encoded size of a VarInt.
pub const VARINT_MAX_BYTES: usize = 5;

/// Maximum encoded size of a VarLong.
pub const VARLONG_MAX_BYTES: usize = 10;

#[inline]
fn write_groups(mut value: u64, buf: &mut BytesMut) {
    while value & !u64::from(SEGMENT_BITS) != 0 {
        buf.put_u8((value as u8 & SEGMENT_BITS) | CONTINUE_BIT);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

#[inline]
fn groups_len(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.max(1).div_ceil(7)
}

/// Decode 7-bit groups into a value no wider than `domain_bits`.
fn read_groups(
    data: &[u8],
    offset: usize,
    max_bytes: usize,
    domain_bits: u32,
    type_name: &'static str,
) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let input = data.get(offset..).unwrap_or_default();

    for (index, &byte) in input.iter().enumerate() {
        let shift = 7 * index as u32;
        let group = u64::from(byte & SEGMENT_BITS);

        // Bits shifted past the domain mean the encoder was not ours.
        if shift + 7 > domain_bits && (group >> (domain_bits - shift)) != 0 {
            return Err(ProtocolError::ValueOverflow { type_name });
        }
        result |= group << shift;

        if byte & CONTINUE_BIT == 0 {
            return Ok((result, index + 1));
        }
        if index + 1 >= max_bytes {
            return Err(ProtocolError::ValueTooLong {
                type_name,
                max_bytes,
            });
        }
    }

    Err(ProtocolError::IncompleteValue { type_name })
}

/// Unsigned 32-bit variable-length integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VarInt(pub u32);

impl VarInt {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Number of bytes this value occupies on the wire.
    pub fn encoded_len(self) -> usize {
        groups_len(u64::from(self.0))
    }
}

impl WireType for VarInt {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        write_groups(u64::from(self.0), buf);
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (value, consumed) = read_groups(data, offset, VARINT_MAX_BYTES, 32, "VarInt")?;
        Ok((Self(value as u32), consumed))
    }
}

impl From<u32> for VarInt {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<VarInt> for u32 {
    fn from(value: VarInt) -> Self {
        value.0
    }
}

impl From<VarInt> for i64 {
    fn from(value: VarInt) -> Self {
        i64::from(value.0)
    }
}

impl TryFrom<i64> for VarInt {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "VarInt",
                value: i128::from(value),
                min: 0,
                max: i128::from(u32::MAX),
            })
    }
}

impl TryFrom<usize> for VarInt {
    type Error = ProtocolError;

    fn try_from(value: usize) -> Result<Self> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "VarInt",
                value: value as i128,
                min: 0,
                max: i128::from(u32::MAX),
            })
    }
}

/// Unsigned 64-bit variable-length integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VarLong(pub u64);

impl VarLong {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub fn encoded_len(self) -> usize {
        groups_len(self.0)
    }
}

impl WireType for VarLong {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        write_groups(self.0, buf);
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (value, consumed) = read_groups(data, offset, VARLONG_MAX_BYTES, 64, "VarLong")?;
        Ok((Self(value), consumed))
    }
}

impl From<u64> for VarLong {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for VarLong {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "VarLong",
                value: i128::from(value),
                min: 0,
                max: i128::from(u64::MAX),
            })
    }
}

impl From<VarLong> for i64 {
    // Tags above i64::MAX wrap; enums never use them.
    fn from(value: VarLong) -> Self {
        value.0 as i64
    }
}

/// Append `value` as a VarInt. Used by the framing layer for lengths and ids.
#[inline]
pub fn write_varint(buf: &mut BytesMut, value: u32) {
    write_groups(u64::from(value), buf);
}

/// Read a VarInt from `data[offset..]`.
#[inline]
pub fn read_varint(data: &[u8], offset: usize) -> Result<(u32, usize)> {
    VarInt::decode(data, offset).map(|(v, n)| (v.0, n))
}

/// Encoded length of `value` as a VarInt.
#[inline]
pub fn varint_len(value: u32) -> usize {
    VarInt(value).encoded_len()
}
