//! # mcproto
//!
//! Wire codec, framing and blocking client transport for the Minecraft
//! network protocol.
//!
//! ## Layers
//! - [`core`]: primitive encodings (VarInt, VarLong, String, UUID, ...), the
//!   [`core::Packet`] trait and frame serialize/parse with zlib compression
//! - [`protocol`]: protocol states, directions, the packet registry and the
//!   standard handshake/status packets
//! - [`transport`]: [`transport::PacketIo`], one framed connection over a
//!   blocking stream
//! - [`config`], [`error`], [`utils`]: configuration, error types,
//!   compression, logging and metrics
//!
//! ## Example
//! ```rust
//! use mcproto::core::packet::{serialize, Frame};
//! use mcproto::protocol::packets::{standard_registry, PongResponse};
//! use mcproto::protocol::{Direction, ProtocolState};
//!
//! let bytes = serialize(&PongResponse { timestamp: 123_456_789 }, None)?;
//! assert_eq!(bytes[0], 0x09);
//!
//! let (frame, _) = Frame::parse(&bytes, false)?;
//! let packet = standard_registry().decode(
//!     ProtocolState::Status,
//!     Direction::Clientbound,
//!     frame.id,
//!     &frame.payload,
//! )?;
//! assert_eq!(packet.downcast_ref::<PongResponse>().map(|p| p.timestamp), Some(123_456_789));
//! # Ok::<(), mcproto::error::ProtocolError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use crate::config::ProtocolConfig;
pub use crate::core::{Frame, Packet, WireType};
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::registry::PacketRegistry;
pub use crate::protocol::{Direction, ProtocolState, Side};
pub use crate::transport::PacketIo;
