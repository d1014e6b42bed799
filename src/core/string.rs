//! Length-prefixed UTF-8 strings.
//!
//! Wire form: `[VarInt byte_len][UTF-8 bytes]`. The protocol bounds strings by
//! UTF-16 code units (32767), which also caps the UTF-8 length at three times
//! that and keeps the length prefix within 3 bytes.

use std::fmt;
use std::ops::Deref;

use bytes::{BufMut, BytesMut};

use crate::core::varint::{read_varint, varint_len, write_varint};
use crate::core::{WireType, MAX_LENGTH_PREFIX_BYTES};
use crate::error::{ProtocolError, Result};

/// Maximum UTF-16 code units in a protocol string.
pub const MAX_STRING_CODE_UNITS: usize = 32_767;

/// Maximum UTF-8 bytes in a protocol string.
pub const MAX_STRING_BYTES: usize = MAX_STRING_CODE_UNITS * 3;

/// A string validated against the protocol length limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BoundedString(String);

impl BoundedString {
    /// Validate and wrap `value`.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        validate(&value)?;
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn validate(value: &str) -> Result<()> {
    // UTF-16 never has more code units than UTF-8 has bytes, so check bytes cheaply first.
    if value.len() > MAX_STRING_CODE_UNITS {
        let code_units = value.encode_utf16().count();
        if code_units > MAX_STRING_CODE_UNITS {
            return Err(ProtocolError::StringTooLong {
                code_units,
                max: MAX_STRING_CODE_UNITS,
            });
        }
    }
    if value.len() > MAX_STRING_BYTES {
        return Err(ProtocolError::StringBytesTooLong {
            bytes: value.len(),
            max: MAX_STRING_BYTES,
        });
    }
    Ok(())
}

impl WireType for BoundedString {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let bytes = self.0.as_bytes();
        let len = u32::try_from(bytes.len()).map_err(|_| ProtocolError::StringBytesTooLong {
            bytes: bytes.len(),
            max: MAX_STRING_BYTES,
        })?;
        let prefix = varint_len(len);
        if prefix > MAX_LENGTH_PREFIX_BYTES {
            return Err(ProtocolError::LengthPrefixOverflow {
                actual: prefix,
                max: MAX_LENGTH_PREFIX_BYTES,
            });
        }
        buf.reserve(prefix + bytes.len());
        write_varint(buf, len);
        buf.put_slice(bytes);
        Ok(())
    }

    fn decode(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let (len, prefix) = read_varint(data, offset)?;
        let len = len as usize;
        let start = offset + prefix;
        let available = data.len().saturating_sub(start);
        if available < len {
            return Err(ProtocolError::InsufficientBytes {
                type_name: "String",
                needed: len,
                available,
            });
        }

        let text = std::str::from_utf8(&data[start..start + len])?;
        Ok((Self::new(text)?, prefix + len))
    }
}

impl Deref for BoundedString {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for BoundedString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for BoundedString {
    type Error = ProtocolError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for BoundedString {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl fmt::Display for BoundedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
