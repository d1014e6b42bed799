//! Fixed-width primitives: Boolean, UnsignedShort, Long, UUID and Enum.

use std::fmt;
use std::marker::PhantomData;

use bytes::{BufMut, BytesMut};
use uuid::Uuid;

use crate::core::WireType;
use crate::error::{ProtocolError, Result};

/// Borrow exactly `N` bytes at `offset` or report how many were missing.
fn take<const N: usize>(data: &[u8], offset: usize, type_name: &'static str) -> Result<[u8; N]> {
    data.get(offset..)
        .and_then(|rest| rest.get(..N))
        .and_then(|slice| <[u8; N]>::try_from(slice).ok())
        .ok_or(ProtocolError::InsufficientBytes {
            type_name,
            needed: N,
            available: data.len().saturating_sub(offset),
        })
}

/// Single-byte boolean: `0x00` false, `0x01` true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Boolean(pub bool);

impl WireType for Boolean {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u8(u8::from(self.0));
        Ok(())
    }

    /// Any non-zero byte decodes as `true`.
    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let [byte] = take::<1>(data, offset, "Boolean")?;
        Ok((Self(byte != 0), 1))
    }
}

impl From<bool> for Boolean {
    fn from(value: bool) -> Self {
        Self(value)
    }
}

/// Unsigned 16-bit big-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UnsignedShort(pub u16);

impl WireType for UnsignedShort {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u16(self.0);
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let raw = take::<2>(data, offset, "UnsignedShort")?;
        Ok((Self(u16::from_be_bytes(raw)), 2))
    }
}

impl From<u16> for UnsignedShort {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<UnsignedShort> for i64 {
    fn from(value: UnsignedShort) -> Self {
        i64::from(value.0)
    }
}

impl TryFrom<i64> for UnsignedShort {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self> {
        u16::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "UnsignedShort",
                value: i128::from(value),
                min: 0,
                max: i128::from(u16::MAX),
            })
    }
}

/// Signed 64-bit big-endian two's complement integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Long(pub i64);

impl Long {
    /// Decode from the first 8 bytes of `data`.
    pub fn from_be_slice(data: &[u8]) -> Result<Self> {
        Self::decode(data, 0).map(|(value, _)| value)
    }
}

impl WireType for Long {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i64(self.0);
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let raw = take::<8>(data, offset, "Long")?;
        Ok((Self(i64::from_be_bytes(raw)), 8))
    }
}

impl From<i64> for Long {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Long> for i64 {
    fn from(value: Long) -> Self {
        value.0
    }
}

impl TryFrom<i128> for Long {
    type Error = ProtocolError;

    fn try_from(value: i128) -> Result<Self> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "Long",
                value,
                min: i128::from(i64::MIN),
                max: i128::from(i64::MAX),
            })
    }
}

impl fmt::Display for Long {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// UUIDs travel as 16 big-endian bytes, most significant half first.
impl WireType for Uuid {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_slice(self.as_bytes());
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let raw = take::<16>(data, offset, "UUID")?;
        Ok((Uuid::from_bytes(raw), 16))
    }
}

/// Access to the two 64-bit halves some packets send separately.
pub trait UuidExt {
    /// Most significant 64 bits.
    fn msb(&self) -> u64;
    /// Least significant 64 bits.
    fn lsb(&self) -> u64;
    fn from_halves(msb: u64, lsb: u64) -> Self;
}

impl UuidExt for Uuid {
    fn msb(&self) -> u64 {
        self.as_u64_pair().0
    }

    fn lsb(&self) -> u64 {
        self.as_u64_pair().1
    }

    fn from_halves(msb: u64, lsb: u64) -> Self {
        Uuid::from_u64_pair(msb, lsb)
    }
}

/// An integer tag with no wire shape of its own.
///
/// Encoding converts the tag into the base primitive `B` on every call and
/// delegates to it, so a tag outside `B`'s range fails at encode time.
pub struct Enum<B> {
    value: i64,
    _base: PhantomData<B>,
}

impl<B> Enum<B> {
    pub const fn new(value: i64) -> Self {
        Self {
            value,
            _base: PhantomData,
        }
    }

    pub const fn value(&self) -> i64 {
        self.value
    }
}

impl<B> Clone for Enum<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Enum<B> {}

impl<B> PartialEq for Enum<B> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<B> Eq for Enum<B> {}

impl<B> fmt::Debug for Enum<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Enum")
            .field(&self.value)
            .field(&std::any::type_name::<B>())
            .finish()
    }
}

impl<B> WireType for Enum<B>
where
    B: WireType + TryFrom<i64, Error = ProtocolError>,
    i64: From<B>,
{
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        B::try_from(self.value)?.encode(buf)
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (base, consumed) = B::decode(data, offset)?;
        Ok((Self::new(i64::from(base)), consumed))
    }
}
