//! # Transport Layer
//!
//! Blocking, framed packet I/O over any `Read + Write` stream.
//!
//! [`stream::PacketIo`] is the synchronous counterpart of
//! [`crate::core::codec::FrameCodec`]: same framing rules, but driven by
//! ordinary blocking reads and writes, plus registry resolution and protocol
//! state tracking. Timeouts belong to the stream (see
//! [`stream::PacketIo::connect`]).

pub mod stream;

pub use stream::PacketIo;
