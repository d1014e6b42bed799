//! Packet registry: static `(state, direction, id)` dispatch.
//!
//! Each registered [`PacketSchema`] carries two constructors: one decoding a
//! received payload, one building an outbound packet from named fields. The
//! registry is built once through [`RegistryBuilder`] or from a
//! [`RegistryLayout`] and is read-only afterwards.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::packet::Packet;
use crate::error::{ProtocolError, Result};
use crate::protocol::fields::Fields;
use crate::protocol::{Direction, ProtocolState};

/// Decode a received payload (bytes after the packet id).
pub type DecodeFn = fn(&[u8]) -> Result<Box<dyn Packet>>;

/// Build an outbound packet from named field values.
pub type BuildFn = fn(&Fields) -> Result<Box<dyn Packet>>;

/// Static description of one packet type.
pub struct PacketSchema {
    pub name: &'static str,
    pub id: u32,
    /// Field names in wire order.
    pub fields: &'static [&'static str],
    pub decode: DecodeFn,
    pub build: BuildFn,
}

impl fmt::Debug for PacketSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketSchema")
            .field("name", &self.name)
            .field("id", &format_args!("{:#04x}", self.id))
            .field("fields", &self.fields)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RegistryKey {
    state: ProtocolState,
    direction: Direction,
    id: u32,
}

/// Immutable lookup table from `(state, direction, id)` to schema.
#[derive(Debug, Default)]
pub struct PacketRegistry {
    entries: HashMap<RegistryKey, &'static PacketSchema>,
}

impl PacketRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up the schema for a key.
    pub fn resolve(
        &self,
        state: ProtocolState,
        direction: Direction,
        id: u32,
    ) -> Result<&'static PacketSchema> {
        self.entries
            .get(&RegistryKey {
                state,
                direction,
                id,
            })
            .copied()
            .ok_or(ProtocolError::UnknownPacket {
                state,
                direction,
                id,
            })
    }

    /// Construct a received packet from its payload.
    pub fn decode(
        &self,
        state: ProtocolState,
        direction: Direction,
        id: u32,
        payload: &[u8],
    ) -> Result<Box<dyn Packet>> {
        let schema = self.resolve(state, direction, id)?;
        (schema.decode)(payload)
    }

    /// Construct an outbound packet from named field values.
    pub fn build(
        &self,
        state: ProtocolState,
        direction: Direction,
        id: u32,
        fields: &Fields,
    ) -> Result<Box<dyn Packet>> {
        let schema = self.resolve(state, direction, id)?;
        (schema.build)(fields)
    }

    pub fn contains(&self, state: ProtocolState, direction: Direction, id: u32) -> bool {
        self.resolve(state, direction, id).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build a registry from a layout, resolving schema names in `catalog`.
    pub fn from_layout(layout: &RegistryLayout, catalog: &SchemaCatalog) -> Result<Self> {
        let mut builder = Self::builder();
        for (state_name, directions) in &layout.0 {
            let state: ProtocolState = state_name.parse()?;
            for (direction_name, ids) in directions {
                let direction: Direction = direction_name.parse()?;
                for (hex_id, schema_name) in ids {
                    let id = parse_hex_id(hex_id)?;
                    let schema = catalog.get(schema_name).ok_or_else(|| {
                        ProtocolError::ConfigError(format!(
                            "Unknown packet schema '{schema_name}' for {state}.{direction}.{hex_id}"
                        ))
                    })?;
                    if schema.id != id {
                        return Err(ProtocolError::ConfigError(format!(
                            "Schema '{schema_name}' has id {:#04x} but is mapped to {hex_id}",
                            schema.id
                        )));
                    }
                    builder = builder.register(state, direction, schema)?;
                }
            }
        }
        Ok(builder.build())
    }
}

/// Collects schemas and produces a [`PacketRegistry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<RegistryKey, &'static PacketSchema>,
}

impl RegistryBuilder {
    /// Register `schema` under its own id. Registering a key twice is an error.
    pub fn register(
        mut self,
        state: ProtocolState,
        direction: Direction,
        schema: &'static PacketSchema,
    ) -> Result<Self> {
        let key = RegistryKey {
            state,
            direction,
            id: schema.id,
        };
        if self.entries.insert(key, schema).is_some() {
            return Err(ProtocolError::DuplicatePacket {
                state,
                direction,
                id: schema.id,
            });
        }
        Ok(self)
    }

    pub fn build(self) -> PacketRegistry {
        debug!(entries = self.entries.len(), "Packet registry built");
        PacketRegistry {
            entries: self.entries,
        }
    }
}

/// Schemas available to a layout, by name.
#[derive(Debug, Default)]
pub struct SchemaCatalog {
    schemas: HashMap<&'static str, &'static PacketSchema>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, schema: &'static PacketSchema) -> Self {
        self.schemas.insert(schema.name, schema);
        self
    }

    pub fn get(&self, name: &str) -> Option<&'static PacketSchema> {
        self.schemas.get(name).copied()
    }
}

impl FromIterator<&'static PacketSchema> for SchemaCatalog {
    fn from_iter<I: IntoIterator<Item = &'static PacketSchema>>(iter: I) -> Self {
        iter.into_iter().fold(Self::new(), Self::with)
    }
}

/// External registry description: `state -> direction -> "0xNN" -> schema name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryLayout(pub BTreeMap<String, BTreeMap<String, BTreeMap<String, String>>>);

impl RegistryLayout {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse registry JSON: {e}")))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse registry TOML: {e}")))
    }
}

/// Parse ids written as `0x1a`, `0X1A` or plain decimal.
pub fn parse_hex_id(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|_| ProtocolError::ConfigError(format!("Invalid packet id: '{text}'")))
}
