//! Standard packet schemas for the handshake and status exchange.
//!
//! | State       | Direction   | Id   | Packet           |
//! |-------------|-------------|------|------------------|
//! | Handshaking | serverbound | 0x00 | `Intention`      |
//! | Status      | serverbound | 0x00 | `StatusRequest`  |
//! | Status      | serverbound | 0x01 | `PingRequest`    |
//! | Status      | clientbound | 0x00 | `StatusResponse` |
//! | Status      | clientbound | 0x01 | `PongResponse`   |
//!
//! The legacy (pre-netty) server list ping is not framed and lives outside the
//! registry; see [`LegacyServerListPing`].

use std::sync::Arc;

use bytes::{BufMut, BytesMut};
use once_cell::sync::Lazy;
use tracing::error;

use crate::core::primitives::{Enum, Long, UnsignedShort};
use crate::core::string::BoundedString;
use crate::core::varint::VarInt;
use crate::core::{FieldReader, Packet, WireType};
use crate::error::{ProtocolError, Result};
use crate::protocol::fields::Fields;
use crate::protocol::registry::{PacketRegistry, PacketSchema, SchemaCatalog};
use crate::protocol::{Direction, ProtocolState};

/// What the client wants to do after the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Status = 1,
    Login = 2,
    Transfer = 3,
}

impl Intent {
    /// State the connection enters once the handshake is sent.
    pub fn next_state(self) -> ProtocolState {
        match self {
            Intent::Status => ProtocolState::Status,
            Intent::Login => ProtocolState::Login,
            Intent::Transfer => ProtocolState::Transfer,
        }
    }

    fn as_enum(self) -> Enum<VarInt> {
        Enum::new(self as i64)
    }
}

impl TryFrom<i64> for Intent {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Intent::Status),
            2 => Ok(Intent::Login),
            3 => Ok(Intent::Transfer),
            other => Err(ProtocolError::InvalidField {
                field: "intent",
                reason: format!(
                    "must be 1 (Status), 2 (Login), or 3 (Transfer), got {other}"
                ),
            }),
        }
    }
}

/// Handshake packet, sent right after the TCP connection opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intention {
    pub protocol_version: u32,
    pub server_address: BoundedString,
    pub server_port: u16,
    pub intent: Intent,
}

impl Intention {
    pub fn new(
        protocol_version: u32,
        server_address: &str,
        server_port: u16,
        intent: Intent,
    ) -> Result<Self> {
        Ok(Self {
            protocol_version,
            server_address: BoundedString::new(server_address)?,
            server_port,
            intent,
        })
    }

    fn decode(payload: &[u8]) -> Result<Box<dyn Packet>> {
        let mut reader = FieldReader::new(payload);
        let protocol_version = reader.read::<VarInt>()?.value();
        let server_address = reader.read::<BoundedString>()?;
        let server_port = reader.read::<UnsignedShort>()?.0;
        let intent = Intent::try_from(reader.read::<Enum<VarInt>>()?.value())?;
        Ok(Box::new(Self {
            protocol_version,
            server_address,
            server_port,
            intent,
        }))
    }

    fn build(fields: &Fields) -> Result<Box<dyn Packet>> {
        let name = INTENTION.name;
        let intent = Intent::try_from(i64::from(fields.var_int(name, "intent")?))?;
        Ok(Box::new(Self::new(
            fields.var_int(name, "protocol_version")?,
            fields.string(name, "server_address")?,
            fields.unsigned_short(name, "server_port")?,
            intent,
        )?))
    }
}

impl Packet for Intention {
    fn id(&self) -> VarInt {
        VarInt(INTENTION.id)
    }

    fn name(&self) -> &'static str {
        INTENTION.name
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<()> {
        VarInt(self.protocol_version).encode(buf)?;
        self.server_address.encode(buf)?;
        UnsignedShort(self.server_port).encode(buf)?;
        self.intent.as_enum().encode(buf)
    }
}

pub static INTENTION: PacketSchema = PacketSchema {
    name: "intention",
    id: 0x00,
    fields: &["protocol_version", "server_address", "server_port", "intent"],
    decode: Intention::decode,
    build: Intention::build,
};

/// Empty request for the server status JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRequest;

impl StatusRequest {
    fn decode(_payload: &[u8]) -> Result<Box<dyn Packet>> {
        Ok(Box::new(StatusRequest))
    }

    fn build(_fields: &Fields) -> Result<Box<dyn Packet>> {
        Ok(Box::new(StatusRequest))
    }
}

impl Packet for StatusRequest {
    fn id(&self) -> VarInt {
        VarInt(STATUS_REQUEST.id)
    }

    fn name(&self) -> &'static str {
        STATUS_REQUEST.name
    }

    fn write_fields(&self, _buf: &mut BytesMut) -> Result<()> {
        Ok(())
    }
}

pub static STATUS_REQUEST: PacketSchema = PacketSchema {
    name: "status_request",
    id: 0x00,
    fields: &[],
    decode: StatusRequest::decode,
    build: StatusRequest::build,
};

/// Server status as an opaque JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusResponse {
    pub json: BoundedString,
}

impl StatusResponse {
    pub fn new(json: &str) -> Result<Self> {
        Ok(Self {
            json: BoundedString::new(json)?,
        })
    }

    fn decode(payload: &[u8]) -> Result<Box<dyn Packet>> {
        let json = FieldReader::new(payload).read::<BoundedString>()?;
        Ok(Box::new(Self { json }))
    }

    fn build(fields: &Fields) -> Result<Box<dyn Packet>> {
        Ok(Box::new(Self::new(fields.string(STATUS_RESPONSE.name, "json")?)?))
    }
}

impl Packet for StatusResponse {
    fn id(&self) -> VarInt {
        VarInt(STATUS_RESPONSE.id)
    }

    fn name(&self) -> &'static str {
        STATUS_RESPONSE.name
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<()> {
        self.json.encode(buf)
    }
}

pub static STATUS_RESPONSE: PacketSchema = PacketSchema {
    name: "status_response",
    id: 0x00,
    fields: &["json"],
    decode: StatusResponse::decode,
    build: StatusResponse::build,
};

/// Ping carrying an arbitrary timestamp the server echoes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRequest {
    pub timestamp: i64,
}

impl PingRequest {
    fn decode(payload: &[u8]) -> Result<Box<dyn Packet>> {
        let timestamp = Long::from_be_slice(payload)?.0;
        Ok(Box::new(Self { timestamp }))
    }

    fn build(fields: &Fields) -> Result<Box<dyn Packet>> {
        let timestamp = fields.long(PING_REQUEST.name, "timestamp")?;
        Ok(Box::new(Self { timestamp }))
    }
}

impl Packet for PingRequest {
    fn id(&self) -> VarInt {
        VarInt(PING_REQUEST.id)
    }

    fn name(&self) -> &'static str {
        PING_REQUEST.name
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<()> {
        Long(self.timestamp).encode(buf)
    }
}

pub static PING_REQUEST: PacketSchema = PacketSchema {
    name: "ping_request",
    id: 0x01,
    fields: &["timestamp"],
    decode: PingRequest::decode,
    build: PingRequest::build,
};

/// The server's echo of a [`PingRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PongResponse {
    pub timestamp: i64,
}

impl PongResponse {
    fn decode(payload: &[u8]) -> Result<Box<dyn Packet>> {
        let timestamp = Long::from_be_slice(payload)?.0;
        Ok(Box::new(Self { timestamp }))
    }

    fn build(fields: &Fields) -> Result<Box<dyn Packet>> {
        let timestamp = fields.long(PONG_RESPONSE.name, "timestamp")?;
        Ok(Box::new(Self { timestamp }))
    }
}

impl Packet for PongResponse {
    fn id(&self) -> VarInt {
        VarInt(PONG_RESPONSE.id)
    }

    fn name(&self) -> &'static str {
        PONG_RESPONSE.name
    }

    fn write_fields(&self, buf: &mut BytesMut) -> Result<()> {
        Long(self.timestamp).encode(buf)
    }
}

pub static PONG_RESPONSE: PacketSchema = PacketSchema {
    name: "pong_response",
    id: 0x01,
    fields: &["timestamp"],
    decode: PongResponse::decode,
    build: PongResponse::build,
};

/// Every standard schema, for building layouts by name.
pub fn standard_catalog() -> SchemaCatalog {
    [
        &INTENTION,
        &STATUS_REQUEST,
        &STATUS_RESPONSE,
        &PING_REQUEST,
        &PONG_RESPONSE,
    ]
    .into_iter()
    .collect()
}

pub(crate) type StandardEntry = (ProtocolState, Direction, &'static PacketSchema);

static STANDARD_TABLE: [StandardEntry; 5] = [
    (ProtocolState::Handshaking, Direction::Serverbound, &INTENTION),
    (ProtocolState::Status, Direction::Serverbound, &STATUS_REQUEST),
    (ProtocolState::Status, Direction::Serverbound, &PING_REQUEST),
    (ProtocolState::Status, Direction::Clientbound, &STATUS_RESPONSE),
    (ProtocolState::Status, Direction::Clientbound, &PONG_RESPONSE),
];

pub(crate) fn registry_from_table(table: &[StandardEntry]) -> Result<PacketRegistry> {
    table
        .iter()
        .try_fold(PacketRegistry::builder(), |builder, &(state, direction, schema)| {
            builder.register(state, direction, schema)
        })
        .map(|builder| builder.build())
}

static STANDARD_REGISTRY: Lazy<Arc<PacketRegistry>> = Lazy::new(|| {
    let registry = registry_from_table(&STANDARD_TABLE).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build standard packet registry");
        PacketRegistry::default()
    });
    Arc::new(registry)
});

/// Process-wide registry holding the standard schemas.
pub fn standard_registry() -> Arc<PacketRegistry> {
    Arc::clone(&STANDARD_REGISTRY)
}

/// Pre-netty server list ping (Minecraft 1.6 and older).
///
/// Sent as raw bytes, without a frame. Strings are UTF-16BE prefixed with
/// their length in code units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyServerListPing {
    pub hostname: String,
    pub port: u16,
    pub protocol_version: u8,
}

impl LegacyServerListPing {
    const CHANNEL: &'static str = "MC|PingHost";

    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: 25565,
            protocol_version: 74,
        }
    }

    pub fn to_bytes(&self) -> Result<BytesMut> {
        let channel: Vec<u16> = Self::CHANNEL.encode_utf16().collect();
        let host: Vec<u16> = self.hostname.encode_utf16().collect();
        let host_units = u16::try_from(host.len()).map_err(|_| ProtocolError::StringTooLong {
            code_units: host.len(),
            max: usize::from(u16::MAX),
        })?;
        let rest_len = u16::try_from(7 + host.len() * 2).map_err(|_| {
            ProtocolError::StringTooLong {
                code_units: host.len(),
                max: (usize::from(u16::MAX) - 7) / 2,
            }
        })?;

        let mut buf = BytesMut::with_capacity(3 + 2 + channel.len() * 2 + 2 + rest_len as usize);
        buf.put_u8(0xFE);
        buf.put_u8(0x01);
        buf.put_u8(0xFA);
        buf.put_u16(channel.len() as u16);
        channel.iter().for_each(|unit| buf.put_u16(*unit));
        buf.put_u16(rest_len);
        buf.put_u8(self.protocol_version);
        buf.put_u16(host_units);
        host.iter().for_each(|unit| buf.put_u16(*unit));
        buf.put_i32(i32::from(self.port));
        Ok(buf)
    }
}
