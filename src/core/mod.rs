//! # Core Protocol Components
//!
//! Wire primitives, packet framing and the async frame codec.
//!
//! This module provides the foundation for the protocol: the byte-exact
//! encodings of every primitive, the [`packet::Packet`] capability trait and
//! the frame envelope that carries a packet over a stream.
//!
//! ## Components
//! - **VarInt / VarLong**: self-terminating 7-bit group integers
//! - **Primitives**: Boolean, UnsignedShort, Long, UUID, Enum
//! - **String**: bounded UTF-8 string with VarInt length prefix
//! - **Packet**: frame serialize/parse with optional zlib compression
//! - **Codec**: Tokio codec for the same frames over async byte streams
//!
//! ## Wire Format
//! ```text
//! uncompressed:          [VarInt len] [VarInt id] [fields...]
//! compressed, small:     [VarInt len] [0x00] [VarInt id] [fields...]
//! compressed, large:     [VarInt len] [VarInt data_len] [zlib(id + fields)]
//! ```
//!
//! ## Limits
//! - Frame length prefix: at most 3 bytes (2,097,151)
//! - Uncompressed body: at most 8 MiB
//! - Strings: at most 32767 UTF-16 code units

use bytes::{Bytes, BytesMut};

use crate::error::Result;

pub mod codec;
pub mod packet;
pub mod primitives;
pub mod string;
pub mod varint;

/// Largest value a 3-byte VarInt can carry; bounds every frame length.
pub const MAX_FRAME_LENGTH: usize = 2_097_151;

/// Maximum size of an uncompressed packet body (id + fields).
pub const MAX_UNCOMPRESSED_LENGTH: usize = 8_388_608;

/// Maximum number of bytes allowed for frame and string length prefixes.
pub const MAX_LENGTH_PREFIX_BYTES: usize = 3;

/// A value with a fixed wire encoding.
///
/// `decode` reads starting at `offset` and reports how many bytes it consumed,
/// so callers can walk a packet payload field by field.
pub trait WireType: Sized {
    /// Append the encoded form to `buf`.
    fn encode(&self, buf: &mut BytesMut) -> Result<()>;

    /// Decode a value from `data[offset..]`, returning it with the consumed byte count.
    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)>;

    /// Encode into a fresh buffer.
    fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Sequential decoder over a packet payload.
#[derive(Debug)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Decode the next field and advance past it.
    pub fn read<T: WireType>(&mut self) -> Result<T> {
        let (value, consumed) = T::decode(self.data, self.offset)?;
        self.offset += consumed;
        Ok(value)
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.offset.min(self.data.len())..]
    }

    pub fn position(&self) -> usize {
        self.offset
    }
}

pub use packet::{Frame, Packet};
pub use primitives::{Boolean, Enum, Long, UnsignedShort, UuidExt};
pub use string::BoundedString;
pub use varint::{VarInt, VarLong};
