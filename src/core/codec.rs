//! Tokio codec for protocol frames.
//!
//! Applies the same length discovery and compression rules as the blocking
//! transport, for callers that run frames over `tokio_util::codec::Framed`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::packet::{frame_length, Frame};
use crate::error::{ProtocolError, Result};
use crate::utils::compression::DEFAULT_COMPRESSION_LEVEL;

/// Frame codec with a per-connection compression threshold.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    threshold: Option<i32>,
    level: u32,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCodec {
    /// Codec with compression disabled.
    pub fn new() -> Self {
        Self {
            threshold: None,
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    pub fn with_threshold(threshold: Option<i32>) -> Result<Self> {
        let mut codec = Self::new();
        codec.set_threshold(threshold)?;
        Ok(codec)
    }

    pub fn threshold(&self) -> Option<i32> {
        self.threshold
    }

    /// Change the threshold between frames, e.g. after a set-compression packet.
    pub fn set_threshold(&mut self, threshold: Option<i32>) -> Result<()> {
        if let Some(t) = threshold.filter(|t| *t < 0) {
            return Err(ProtocolError::InvalidCompressionThreshold(t));
        }
        self.threshold = threshold;
        Ok(())
    }

    pub fn set_level(&mut self, level: u32) {
        self.level = level;
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        let Some((prefix, total)) = frame_length(src)? else {
            return Ok(None);
        };

        if src.len() < prefix + total {
            // Reserve the rest of the frame so the next read can fill it.
            src.reserve(prefix + total - src.len());
            return Ok(None);
        }

        let (frame, used) = Frame::parse(&src[..prefix + total], self.threshold.is_some())?;
        src.advance(used);
        Ok(Some(frame))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        frame.encode_into(self.threshold, self.level, dst)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_decode_preserves_buffer() {
        let mut codec = FrameCodec::new();
        let mut buffer = BytesMut::from(&[0x04, 0x01, 0x02][..]);
        assert!(codec.decode(&mut buffer).unwrap().is_none());
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_multiple_frames_in_buffer() {
        let mut codec = FrameCodec::with_threshold(Some(64)).unwrap();
        let mut buffer = BytesMut::new();
        codec.encode(Frame::new(0x01, vec![1, 2, 3]), &mut buffer).unwrap();
        codec.encode(Frame::new(0x02, vec![9; 500]), &mut buffer).unwrap();

        let first = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(first, Frame::new(0x01, vec![1, 2, 3]));
        let second = codec.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(second.id, 0x02);
        assert_eq!(second.payload.len(), 500);
        assert!(buffer.is_empty());
        assert!(codec.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn test_rejects_negative_threshold() {
        assert!(FrameCodec::with_threshold(Some(-3)).is_err());
    }

    #[test]
    fn test_overlong_prefix_is_error() {
        let mut codec = FrameCodec::new();
        let mut buffer = BytesMut::from(&[0xFF, 0xFF, 0xFF, 0x01][..]);
        assert!(matches!(
            codec.decode(&mut buffer),
            Err(ProtocolError::LengthPrefixTooLong)
        ));
    }
}
