//! Packets and the frame envelope that carries them.
//!
//! A [`Packet`] knows its id and how to write its fields in order. A [`Frame`]
//! is the id plus the encoded fields, and knows how to wrap itself in one of
//! the three wire shapes depending on the compression threshold in effect.

use std::any::Any;
use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::core::varint::{read_varint, varint_len, write_varint, VarInt};
use crate::core::{MAX_FRAME_LENGTH, MAX_LENGTH_PREFIX_BYTES, MAX_UNCOMPRESSED_LENGTH};
use crate::error::{ProtocolError, Result};
use crate::utils::compression::{self, DEFAULT_COMPRESSION_LEVEL};

/// Object-safe access to `Any` for downcasting decoded packets.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// A protocol packet: an id and an ordered sequence of encoded fields.
pub trait Packet: AsAny + fmt::Debug + Send + Sync + 'static {
    /// Packet id, fixed per (state, direction).
    fn id(&self) -> VarInt;

    /// Schema name used in logs and registry layouts.
    fn name(&self) -> &'static str;

    /// Append every field, in protocol order.
    fn write_fields(&self, buf: &mut BytesMut) -> Result<()>;
}

impl dyn Packet {
    pub fn is<T: Packet>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Packet>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast<T: Packet>(self: Box<Self>) -> Option<Box<T>> {
        self.into_any().downcast::<T>().ok()
    }
}

/// Where the frame length prefix ends and how long the frame claims to be.
///
/// Returns `Ok(None)` while fewer than 3 bytes are available and no terminating
/// byte has been seen yet.
pub fn frame_length(data: &[u8]) -> Result<Option<(usize, usize)>> {
    let window = &data[..data.len().min(MAX_LENGTH_PREFIX_BYTES)];
    match window.iter().position(|b| b & 0x80 == 0) {
        Some(last) => {
            let (length, prefix) = read_varint(data, 0)?;
            debug_assert_eq!(prefix, last + 1);
            let length = length as usize;
            if length > MAX_FRAME_LENGTH {
                return Err(ProtocolError::FrameTooLarge {
                    length,
                    max: MAX_FRAME_LENGTH,
                });
            }
            Ok(Some((prefix, length)))
        }
        None if window.len() == MAX_LENGTH_PREFIX_BYTES => Err(ProtocolError::LengthPrefixTooLong),
        None => Ok(None),
    }
}

// A total length fits a 3-byte prefix exactly when it is at most MAX_FRAME_LENGTH.
fn check_prefix(total: usize) -> Result<u32> {
    if total > MAX_FRAME_LENGTH {
        return Err(ProtocolError::LengthPrefixOverflow {
            actual: u32::try_from(total).map(varint_len).unwrap_or(5),
            max: MAX_LENGTH_PREFIX_BYTES,
        });
    }
    Ok(total as u32)
}

/// A packet id with its encoded fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
    pub payload: Bytes,
}

impl Frame {
    pub fn new(id: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Collect a packet's id and fields.
    pub fn from_packet(packet: &dyn Packet) -> Result<Self> {
        let mut payload = BytesMut::new();
        packet.write_fields(&mut payload)?;
        Ok(Self {
            id: packet.id().value(),
            payload: payload.freeze(),
        })
    }

    /// Length of the uncompressed body (id + payload).
    pub fn body_len(&self) -> usize {
        varint_len(self.id) + self.payload.len()
    }

    fn body(&self) -> BytesMut {
        let mut body = BytesMut::with_capacity(self.body_len());
        write_varint(&mut body, self.id);
        body.put_slice(&self.payload);
        body
    }

    /// Collect a packet and encode it in one step.
    pub fn serialize(packet: &dyn Packet, threshold: Option<i32>) -> Result<BytesMut> {
        Self::from_packet(packet)?.encode(threshold)
    }

    /// Encode this frame with the default zlib level.
    ///
    /// `threshold` of `None` disables compression; otherwise bodies shorter than
    /// the threshold are sent raw behind a zero data length marker.
    pub fn encode(&self, threshold: Option<i32>) -> Result<BytesMut> {
        let mut dst = BytesMut::new();
        self.encode_into(threshold, DEFAULT_COMPRESSION_LEVEL, &mut dst)?;
        Ok(dst)
    }

    /// Append the wire form of this frame to `dst`.
    pub fn encode_into(&self, threshold: Option<i32>, level: u32, dst: &mut BytesMut) -> Result<()> {
        let body_len = self.body_len();
        if body_len > MAX_UNCOMPRESSED_LENGTH {
            return Err(ProtocolError::OversizedPacket {
                size: body_len,
                max: MAX_UNCOMPRESSED_LENGTH,
            });
        }

        let Some(threshold) = threshold else {
            let total = check_prefix(body_len)?;
            dst.reserve(varint_len(total) + body_len);
            write_varint(dst, total);
            dst.put_slice(&self.body());
            return Ok(());
        };

        if threshold < 0 {
            return Err(ProtocolError::InvalidCompressionThreshold(threshold));
        }

        if body_len < threshold as usize {
            let total = check_prefix(1 + body_len)?;
            dst.reserve(varint_len(total) + 1 + body_len);
            write_varint(dst, total);
            dst.put_u8(0);
            dst.put_slice(&self.body());
            return Ok(());
        }

        let compressed = compression::compress(&self.body(), level)?;
        let data_len = body_len as u32;
        let total = check_prefix(varint_len(data_len) + compressed.len())?;
        trace!(
            id = self.id,
            uncompressed = body_len,
            compressed = compressed.len(),
            "Compressed frame body"
        );
        dst.reserve(varint_len(total) + total as usize);
        write_varint(dst, total);
        write_varint(dst, data_len);
        dst.put_slice(&compressed);
        Ok(())
    }

    /// Parse one frame from the start of `data`.
    ///
    /// `compressed` tells whether the connection has compression enabled, which
    /// decides whether a data length field follows the frame length. Returns the
    /// frame and the number of bytes it occupied.
    pub fn parse(data: &[u8], compressed: bool) -> Result<(Self, usize)> {
        let (prefix, total) = match frame_length(data)? {
            Some(found) => found,
            None => return Err(ProtocolError::IncompleteValue { type_name: "VarInt" }),
        };
        let available = data.len() - prefix;
        if available < total {
            return Err(ProtocolError::TruncatedFrame {
                expected: total,
                actual: available,
            });
        }
        let frame = &data[prefix..prefix + total];

        let inflated;
        let body: &[u8] = if compressed {
            let (data_len, n) = read_varint(frame, 0)?;
            if data_len == 0 {
                &frame[n..]
            } else {
                inflated = compression::decompress(&frame[n..], data_len as usize)?;
                &inflated
            }
        } else {
            frame
        };

        let (id, n) = read_varint(body, 0)?;
        Ok((
            Self {
                id,
                payload: Bytes::copy_from_slice(&body[n..]),
            },
            prefix + total,
        ))
    }
}

/// Serialize a packet into a complete wire frame.
pub fn serialize(packet: &dyn Packet, threshold: Option<i32>) -> Result<BytesMut> {
    Frame::serialize(packet, threshold)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Raw(u32, Vec<u8>);

    impl Packet for Raw {
        fn id(&self) -> VarInt {
            VarInt(self.0)
        }

        fn name(&self) -> &'static str {
            "raw"
        }

        fn write_fields(&self, buf: &mut BytesMut) -> Result<()> {
            buf.put_slice(&self.1);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Other;

    impl Packet for Other {
        fn id(&self) -> VarInt {
            VarInt(0x7F)
        }

        fn name(&self) -> &'static str {
            "other"
        }

        fn write_fields(&self, _buf: &mut BytesMut) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_downcast_boxed_packet() {
        let packet: Box<dyn Packet> = Box::new(Raw(0x05, vec![9]));
        assert!(packet.is::<Raw>());
        assert!(!packet.is::<Other>());
        assert_eq!(packet.downcast_ref::<Raw>().unwrap().1, vec![9]);
        assert!(packet.downcast_ref::<Other>().is_none());

        let raw = packet.downcast::<Raw>().unwrap();
        assert_eq!(raw.0, 0x05);

        let other: Box<dyn Packet> = Box::new(Other);
        assert!(other.downcast::<Raw>().is_none());
    }

    #[test]
    fn test_uncompressed_shape() {
        let bytes = serialize(&Raw(0x01, vec![0xAA, 0xBB]), None).unwrap();
        assert_eq!(&bytes[..], &[0x03, 0x01, 0xAA, 0xBB]);

        let (frame, used) = Frame::parse(&bytes, false).unwrap();
        assert_eq!(frame, Frame::new(0x01, vec![0xAA, 0xBB]));
        assert_eq!(used, 4);
    }

    #[test]
    fn test_below_threshold_shape() {
        // body is 4 bytes, threshold 5
        let bytes = serialize(&Raw(0x02, vec![1, 2, 3]), Some(5)).unwrap();
        assert_eq!(&bytes[..], &[0x05, 0x00, 0x02, 1, 2, 3]);

        let (frame, _) = Frame::parse(&bytes, true).unwrap();
        assert_eq!(frame, Frame::new(0x02, vec![1, 2, 3]));
    }

    #[test]
    fn test_at_threshold_compresses() {
        let payload = vec![0x42; 255];
        let bytes = serialize(&Raw(0x03, payload.clone()), Some(256)).unwrap();
        // data length field carries the uncompressed body length (256 -> 0x80 0x02)
        let (_, prefix) = read_varint(&bytes, 0).unwrap();
        assert_eq!(&bytes[prefix..prefix + 2], &[0x80, 0x02]);
        assert!(bytes.len() < 256);

        let (frame, used) = Frame::parse(&bytes, true).unwrap();
        assert_eq!(frame.id, 0x03);
        assert_eq!(frame.payload.as_ref(), payload.as_slice());
        assert_eq!(used, bytes.len());
    }

    #[test]
    fn test_zero_threshold_compresses_everything() {
        let bytes = serialize(&Raw(0x00, vec![]), Some(0)).unwrap();
        let (_, prefix) = read_varint(&bytes, 0).unwrap();
        assert_eq!(bytes[prefix], 0x01);
        let (frame, _) = Frame::parse(&bytes, true).unwrap();
        assert_eq!(frame, Frame::new(0x00, Bytes::new()));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        assert!(matches!(
            serialize(&Raw(0x00, vec![]), Some(-1)),
            Err(ProtocolError::InvalidCompressionThreshold(-1))
        ));
    }

    #[test]
    fn test_uncompressed_prefix_limit() {
        let payload = vec![0u8; MAX_FRAME_LENGTH];
        let err = serialize(&Raw(0x01, payload), None).unwrap_err();
        assert!(matches!(err, ProtocolError::LengthPrefixOverflow { .. }));
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_oversized_body() {
        let payload = vec![0u8; MAX_UNCOMPRESSED_LENGTH];
        assert!(matches!(
            serialize(&Raw(0x01, payload), Some(256)),
            Err(ProtocolError::OversizedPacket { .. })
        ));
    }

    #[test]
    fn test_large_body_fits_when_compressed() {
        // Over the 3-byte limit raw, but zeros compress far below it.
        let payload = vec![0u8; 4 * 1024 * 1024];
        let bytes = serialize(&Raw(0x10, payload.clone()), Some(256)).unwrap();
        let (frame, _) = Frame::parse(&bytes, true).unwrap();
        assert_eq!(frame.payload.len(), payload.len());
    }

    #[test]
    fn test_parse_truncated() {
        assert!(matches!(
            Frame::parse(&[0x05, 0x01, 0x02], false),
            Err(ProtocolError::TruncatedFrame {
                expected: 5,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_parse_prefix_too_long() {
        assert!(matches!(
            Frame::parse(&[0x80, 0x80, 0x80, 0x01], false),
            Err(ProtocolError::LengthPrefixTooLong)
        ));
    }

    #[test]
    fn test_frame_length_incomplete() {
        assert_eq!(frame_length(&[]).unwrap(), None);
        assert_eq!(frame_length(&[0x80, 0x80]).unwrap(), None);
        assert_eq!(frame_length(&[0xFF, 0xFF, 0x7F]).unwrap(), Some((3, MAX_FRAME_LENGTH)));
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        let (frame, used) = Frame::parse(&[0x02, 0x07, 0x09, 0xEE, 0xEE], false).unwrap();
        assert_eq!(frame, Frame::new(0x07, vec![0x09]));
        assert_eq!(used, 3);
    }

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn Packet> = Box::new(Raw(1, vec![]));
        assert!(boxed.is::<Raw>());
        assert_eq!(boxed.downcast_ref::<Raw>().map(|r| r.0), Some(1));
        assert!(boxed.downcast::<Raw>().is_some());
    }
}
