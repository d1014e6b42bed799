//! Blocking packet I/O over a byte stream.
//!
//! [`PacketIo`] owns one duplex stream and the per-connection state: the
//! protocol state, the compression threshold and which side of the connection
//! it speaks for. Reads discover the frame length one byte at a time so no
//! byte of the following frame is ever consumed.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, instrument, trace, warn};

use crate::config::{ClientConfig, TransportConfig};
use crate::core::packet::{Frame, Packet};
use crate::core::MAX_LENGTH_PREFIX_BYTES;
use crate::error::{constants, ProtocolError, ReadPhase, Result};
use crate::protocol::fields::Fields;
use crate::protocol::registry::PacketRegistry;
use crate::protocol::{ProtocolState, Side};
use crate::utils::compression::DEFAULT_COMPRESSION_LEVEL;
use crate::utils::metrics::global_metrics;

/// A framed, stateful protocol connection.
///
/// Not meant to be shared between threads; wrap it in a lock if it must be.
pub struct PacketIo<S> {
    stream: S,
    registry: Arc<PacketRegistry>,
    threshold: Option<i32>,
    level: u32,
    state: ProtocolState,
    side: Side,
    closed: bool,
}

impl<S> fmt::Debug for PacketIo<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketIo")
            .field("state", &self.state)
            .field("side", &self.side)
            .field("threshold", &self.threshold)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl PacketIo<TcpStream> {
    /// Open a TCP connection and wrap it as a client.
    ///
    /// Tries every resolved address in turn with the configured connect
    /// timeout, then applies the read and write timeouts to the socket.
    #[instrument(skip(registry, config))]
    pub fn connect(
        addr: &str,
        registry: Arc<PacketRegistry>,
        config: &ClientConfig,
    ) -> Result<Self> {
        let mut last_err = None;
        for candidate in addr.to_socket_addrs()? {
            match TcpStream::connect_timeout(&candidate, config.connection_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(non_zero(config.read_timeout))?;
                    stream.set_write_timeout(non_zero(config.write_timeout))?;
                    stream.set_nodelay(true)?;
                    debug!(peer = %candidate, "Connected");
                    global_metrics().connection_established();
                    return Ok(Self::new(stream, registry));
                }
                Err(e) => {
                    debug!(peer = %candidate, error = %e, "Connect attempt failed");
                    last_err = Some(e);
                }
            }
        }

        global_metrics().connection_error();
        Err(match last_err {
            Some(e) => ProtocolError::Io(e),
            None => ProtocolError::ConfigError(format!("Address '{addr}' did not resolve")),
        })
    }

    /// Connect to `config.address`.
    pub fn connect_with(registry: Arc<PacketRegistry>, config: &ClientConfig) -> Result<Self> {
        Self::connect(&config.address, registry, config)
    }
}

fn non_zero(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

impl<S: Read + Write> PacketIo<S> {
    /// Wrap a stream as a client in the Handshaking state, compression off.
    pub fn new(stream: S, registry: Arc<PacketRegistry>) -> Self {
        Self {
            stream,
            registry,
            threshold: None,
            level: DEFAULT_COMPRESSION_LEVEL,
            state: ProtocolState::Handshaking,
            side: Side::Client,
            closed: false,
        }
    }

    /// Speak for the given side; decides which direction is outbound.
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    /// Wrap a stream with framing settings taken from configuration.
    pub fn from_config(
        stream: S,
        registry: Arc<PacketRegistry>,
        config: &TransportConfig,
    ) -> Result<Self> {
        let mut io = Self::new(stream, registry);
        io.set_compression_threshold(config.compression_threshold)?;
        io.level = config.compression_level.min(9);
        Ok(io)
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    /// Switch the packet table used for later sends and reads.
    pub fn set_state(&mut self, state: ProtocolState) {
        debug!(from = %self.state, to = %state, "Protocol state changed");
        self.state = state;
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn compression_threshold(&self) -> Option<i32> {
        self.threshold
    }

    /// Enable (`Some(t)`, `t >= 0`) or disable (`None`) compression.
    pub fn set_compression_threshold(&mut self, threshold: Option<i32>) -> Result<()> {
        if let Some(t) = threshold.filter(|t| *t < 0) {
            return Err(ProtocolError::InvalidCompressionThreshold(t));
        }
        debug!(?threshold, "Compression threshold changed");
        self.threshold = threshold;
        Ok(())
    }

    pub fn registry(&self) -> &Arc<PacketRegistry> {
        &self.registry
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Build the packet registered under `id` for the outbound direction of
    /// the current state and send it.
    #[instrument(skip(self, fields), fields(state = %self.state))]
    pub fn send(&mut self, id: u32, fields: &Fields) -> Result<()> {
        let packet = self
            .registry
            .build(self.state, self.side.outbound(), id, fields);
        let packet = record(packet)?;
        self.send_packet(packet.as_ref())
    }

    /// Serialize and send a packet without going through the registry.
    pub fn send_packet(&mut self, packet: &dyn Packet) -> Result<()> {
        let result = self.write_packet(packet);
        record(result)
    }

    fn write_packet(&mut self, packet: &dyn Packet) -> Result<()> {
        self.ensure_open()?;
        let frame = Frame::from_packet(packet)?;
        let mut buf = BytesMut::new();
        frame.encode_into(self.threshold, self.level, &mut buf)?;
        let compressed = self
            .threshold
            .is_some_and(|t| frame.body_len() >= t as usize);

        self.write_bytes(&buf)?;
        trace!(
            packet = packet.name(),
            id = frame.id,
            bytes = buf.len(),
            compressed,
            "Sent frame"
        );
        global_metrics().frame_sent(buf.len() as u64, compressed);
        Ok(())
    }

    /// Write bytes outside the framing layer (legacy ping and similar).
    pub fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        let result = self.ensure_open().and_then(|()| self.write_bytes(data));
        record(result)?;
        trace!(bytes = data.len(), "Sent raw bytes");
        global_metrics().raw_write(data.len() as u64);
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        // write_all retries partial writes and Interrupted
        self.stream.write_all(data)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read the next frame and decode it with the registry entry for the
    /// inbound direction of the current state.
    pub fn read(&mut self) -> Result<Box<dyn Packet>> {
        let frame = self.read_frame()?;
        let packet = self.registry.decode(
            self.state,
            self.side.inbound(),
            frame.id,
            &frame.payload,
        );
        let packet = record(packet)?;
        debug!(packet = packet.name(), state = %self.state, "Received packet");
        Ok(packet)
    }

    /// Read the next frame without resolving it.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let result = self.ensure_open().and_then(|()| self.read_raw_frame());
        record(result)
    }

    fn read_raw_frame(&mut self) -> Result<Frame> {
        let mut raw = self.read_length_prefix()?;
        let prefix_len = raw.len();
        let (total, _) = crate::core::varint::read_varint(&raw, 0)?;
        let total = total as usize;

        raw.resize(prefix_len + total, 0);
        self.read_body(&mut raw[prefix_len..])?;

        let (frame, _) = Frame::parse(&raw, self.threshold.is_some())?;
        trace!(id = frame.id, bytes = raw.len(), "Received frame");
        global_metrics().frame_received(raw.len() as u64);
        Ok(frame)
    }

    // One byte per read call, so nothing past the prefix is consumed.
    fn read_length_prefix(&mut self) -> Result<Vec<u8>> {
        let mut prefix = Vec::with_capacity(MAX_LENGTH_PREFIX_BYTES);
        while prefix.len() < MAX_LENGTH_PREFIX_BYTES {
            let mut byte = [0u8; 1];
            loop {
                match self.stream.read(&mut byte) {
                    Ok(0) => {
                        warn!(phase = %ReadPhase::Length, "{}", constants::ERR_CONNECTION_CLOSED);
                        return Err(ProtocolError::ConnectionClosed {
                            phase: ReadPhase::Length,
                            expected: prefix.len() + 1,
                            received: prefix.len(),
                        });
                    }
                    Ok(_) => break,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
            }
            prefix.push(byte[0]);
            if byte[0] & 0x80 == 0 {
                return Ok(prefix);
            }
        }
        Err(ProtocolError::LengthPrefixTooLong)
    }

    fn read_body(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => {
                    warn!(
                        phase = %ReadPhase::Body,
                        expected = buf.len(),
                        received = filled,
                        "{}",
                        constants::ERR_CONNECTION_CLOSED
                    );
                    return Err(ProtocolError::ConnectionClosed {
                        phase: ReadPhase::Body,
                        expected: buf.len(),
                        received: filled,
                    });
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Flush and mark the connection closed. Later sends and reads fail.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        global_metrics().connection_closed();
        debug!(state = %self.state, "Connection closed");
        self.stream.flush()?;
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            warn!("{}", constants::ERR_CLOSED_LOCALLY);
            return Err(ProtocolError::ClosedLocally);
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

fn record<T>(result: Result<T>) -> Result<T> {
    if let Err(ref e) = result {
        global_metrics().record_error(e);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::core::packet::serialize;
    use crate::protocol::packets::{
        standard_registry, PingRequest, PongResponse, StatusResponse, PONG_RESPONSE,
    };
    use crate::protocol::Direction;
    use std::io::Cursor;

    /// Stream returning at most `chunk` bytes per read; writes are captured.
    struct Trickle {
        input: Cursor<Vec<u8>>,
        chunk: usize,
        reads: usize,
        output: Vec<u8>,
    }

    impl Trickle {
        fn new(input: Vec<u8>, chunk: usize) -> Self {
            Self {
                input: Cursor::new(input),
                chunk,
                reads: 0,
                output: Vec::new(),
            }
        }
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            // Every third call is interrupted.
            if self.reads % 3 == 0 {
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            let n = buf.len().min(self.chunk);
            self.input.read(&mut buf[..n])
        }
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk.max(1));
            self.output.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn status_client(input: Vec<u8>, chunk: usize) -> PacketIo<Trickle> {
        let mut io = PacketIo::new(Trickle::new(input, chunk), standard_registry());
        io.set_state(ProtocolState::Status);
        io
    }

    #[test]
    fn test_reads_with_short_reads_and_interrupts() {
        let mut wire = serialize(&PongResponse { timestamp: 99 }, None).unwrap().to_vec();
        wire.extend_from_slice(&serialize(&PongResponse { timestamp: 100 }, None).unwrap());

        let mut io = status_client(wire, 1);
        let first = io.read().unwrap();
        assert_eq!(first.downcast_ref::<PongResponse>().unwrap().timestamp, 99);
        let second = io.read().unwrap();
        assert_eq!(second.downcast_ref::<PongResponse>().unwrap().timestamp, 100);
    }

    #[test]
    fn test_length_prefix_does_not_overread() {
        let frame = serialize(&PongResponse { timestamp: 7 }, None).unwrap();
        let mut io = status_client(frame.to_vec(), 64);
        io.read_frame().unwrap();
        assert_eq!(io.get_ref().input.position() as usize, frame.len());
    }

    #[test]
    fn test_close_mid_length_is_connection_error() {
        let mut io = status_client(vec![0x80, 0x80], 1);
        let err = io.read().unwrap_err();
        assert!(err.is_connection_error());
        assert!(matches!(
            err,
            ProtocolError::ConnectionClosed {
                phase: ReadPhase::Length,
                received: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_close_mid_body_reports_counts() {
        let mut io = status_client(vec![0x09, 0x01, 0x00, 0x00], 4);
        match io.read().unwrap_err() {
            ProtocolError::ConnectionClosed {
                phase,
                expected,
                received,
            } => {
                assert_eq!(phase, ReadPhase::Body);
                assert_eq!(expected, 9);
                assert_eq!(received, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unterminated_prefix_is_format_error() {
        let mut io = status_client(vec![0xFF, 0xFF, 0xFF, 0x01], 1);
        let err = io.read().unwrap_err();
        assert!(matches!(err, ProtocolError::LengthPrefixTooLong));
        assert!(err.is_format_error());
    }

    #[test]
    fn test_send_uses_outbound_direction() {
        let mut io = status_client(Vec::new(), 3);
        io.send(0x01, &Fields::new().with("timestamp", 123_456_789i64))
            .unwrap();
        assert_eq!(
            io.get_ref().output,
            serialize(&PingRequest { timestamp: 123_456_789 }, None)
                .unwrap()
                .to_vec()
        );
    }

    #[test]
    fn test_server_side_reads_serverbound() {
        let wire = serialize(&PingRequest { timestamp: 5 }, None).unwrap().to_vec();
        let mut io = status_client(wire, 2).with_side(Side::Server);
        let packet = io.read().unwrap();
        assert_eq!(packet.downcast_ref::<PingRequest>().unwrap().timestamp, 5);

        io.send(0x01, &Fields::new().with("timestamp", 5i64)).unwrap();
        let (frame, _) = Frame::parse(&io.get_ref().output, false).unwrap();
        assert_eq!(frame.id, PONG_RESPONSE.id);
    }

    #[test]
    fn test_compressed_round_trip() {
        let json = format!("{{\"description\":\"{}\"}}", "x".repeat(600));
        let response = StatusResponse::new(&json).unwrap();

        let mut server = PacketIo::new(Trickle::new(Vec::new(), 128), standard_registry())
            .with_side(Side::Server);
        server.set_state(ProtocolState::Status);
        server.set_compression_threshold(Some(256)).unwrap();
        server.send_packet(&response).unwrap();
        let wire = server.into_inner().output;
        assert!(wire.len() < json.len());

        let mut client = status_client(wire, 5);
        client.set_compression_threshold(Some(256)).unwrap();
        let packet = client.read().unwrap();
        assert_eq!(packet.downcast_ref::<StatusResponse>().unwrap().json.as_str(), json);
    }

    #[test]
    fn test_unknown_packet_in_state() {
        let wire = serialize(&PongResponse { timestamp: 1 }, None).unwrap().to_vec();
        let mut io = PacketIo::new(Trickle::new(wire, 8), standard_registry());
        // Still Handshaking: nothing is clientbound there.
        let err = io.read().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnknownPacket {
                state: ProtocolState::Handshaking,
                direction: Direction::Clientbound,
                id: 0x01
            }
        ));
    }

    #[test]
    fn test_closed_connection_rejects_io() {
        let mut io = status_client(vec![0x01, 0x00], 1);
        io.close().unwrap();
        assert!(io.is_closed());
        assert!(io.read().unwrap_err().is_connection_error());
        assert!(io.send_raw(&[0xFE]).unwrap_err().is_connection_error());
        assert!(io
            .send_packet(&PingRequest { timestamp: 0 })
            .unwrap_err()
            .is_connection_error());
        // Closing twice is a no-op.
        io.close().unwrap();
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut io = status_client(Vec::new(), 1);
        assert!(io.set_compression_threshold(Some(-1)).is_err());
        assert_eq!(io.compression_threshold(), None);
    }

    #[test]
    fn test_from_config() {
        let config = TransportConfig {
            compression_threshold: Some(64),
            compression_level: 9,
        };
        let io = PacketIo::from_config(Trickle::new(Vec::new(), 1), standard_registry(), &config)
            .unwrap();
        assert_eq!(io.compression_threshold(), Some(64));

        let bad = TransportConfig {
            compression_threshold: Some(-5),
            ..config
        };
        assert!(PacketIo::from_config(Trickle::new(Vec::new(), 1), standard_registry(), &bad).is_err());
    }
}
