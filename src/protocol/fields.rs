//! Named field values for building outbound packets through the registry.

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::{ProtocolError, Result};

/// A typed value for one packet field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    VarInt(u32),
    VarLong(u64),
    Bool(bool),
    UnsignedShort(u16),
    Long(i64),
    String(String),
    Uuid(Uuid),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::VarInt(_) => "VarInt",
            FieldValue::VarLong(_) => "VarLong",
            FieldValue::Bool(_) => "Boolean",
            FieldValue::UnsignedShort(_) => "UnsignedShort",
            FieldValue::Long(_) => "Long",
            FieldValue::String(_) => "String",
            FieldValue::Uuid(_) => "UUID",
            FieldValue::Bytes(_) => "Bytes",
        }
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value! {
    u64 => VarLong,
    bool => Bool,
    u16 => UnsignedShort,
    i64 => Long,
    String => String,
    &str => String,
    Uuid => Uuid,
    Vec<u8> => Bytes,
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::VarInt(value)
    }
}

/// Field values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: HashMap<&'static str, FieldValue>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &'static str, value: impl Into<FieldValue>) -> Self {
        self.values.insert(name, value.into());
        self
    }

    pub fn insert(&mut self, name: &'static str, value: impl Into<FieldValue>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn require(&self, packet: &'static str, field: &'static str) -> Result<&FieldValue> {
        self.values
            .get(field)
            .ok_or(ProtocolError::MissingField { packet, field })
    }

    fn mismatch(
        packet: &'static str,
        field: &'static str,
        expected: &'static str,
        got: &FieldValue,
    ) -> ProtocolError {
        ProtocolError::FieldTypeMismatch {
            packet,
            field,
            expected,
            actual: got.type_name(),
        }
    }

    pub fn var_int(&self, packet: &'static str, field: &'static str) -> Result<u32> {
        match self.require(packet, field)? {
            FieldValue::VarInt(v) => Ok(*v),
            other => Err(Self::mismatch(packet, field, "VarInt", other)),
        }
    }

    pub fn unsigned_short(&self, packet: &'static str, field: &'static str) -> Result<u16> {
        match self.require(packet, field)? {
            FieldValue::UnsignedShort(v) => Ok(*v),
            // Ports are often handed over as plain integers.
            FieldValue::VarInt(v) => u16::try_from(*v).map_err(|_| ProtocolError::ValueOutOfRange {
                type_name: "UnsignedShort",
                value: i128::from(*v),
                min: 0,
                max: i128::from(u16::MAX),
            }),
            other => Err(Self::mismatch(packet, field, "UnsignedShort", other)),
        }
    }

    pub fn long(&self, packet: &'static str, field: &'static str) -> Result<i64> {
        match self.require(packet, field)? {
            FieldValue::Long(v) => Ok(*v),
            other => Err(Self::mismatch(packet, field, "Long", other)),
        }
    }

    pub fn string(&self, packet: &'static str, field: &'static str) -> Result<&str> {
        match self.require(packet, field)? {
            FieldValue::String(v) => Ok(v.as_str()),
            other => Err(Self::mismatch(packet, field, "String", other)),
        }
    }

    pub fn var_long(&self, packet: &'static str, field: &'static str) -> Result<u64> {
        match self.require(packet, field)? {
            FieldValue::VarLong(v) => Ok(*v),
            FieldValue::VarInt(v) => Ok(u64::from(*v)),
            other => Err(Self::mismatch(packet, field, "VarLong", other)),
        }
    }

    pub fn boolean(&self, packet: &'static str, field: &'static str) -> Result<bool> {
        match self.require(packet, field)? {
            FieldValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(packet, field, "Boolean", other)),
        }
    }

    pub fn uuid(&self, packet: &'static str, field: &'static str) -> Result<Uuid> {
        match self.require(packet, field)? {
            FieldValue::Uuid(v) => Ok(*v),
            other => Err(Self::mismatch(packet, field, "UUID", other)),
        }
    }

    /// Raw bytes, written without a length prefix.
    pub fn bytes(&self, packet: &'static str, field: &'static str) -> Result<&[u8]> {
        match self.require(packet, field)? {
            FieldValue::Bytes(v) => Ok(v.as_slice()),
            other => Err(Self::mismatch(packet, field, "Bytes", other)),
        }
    }
}
