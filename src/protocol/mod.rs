//! # Protocol Layer
//!
//! Protocol states, packet directions, the packet registry and the standard
//! packet schemas.
//!
//! The registry maps `(state, direction, id)` to a [`registry::PacketSchema`]
//! that can decode a payload or build a packet from named field values. It is
//! assembled once and never mutated, so one instance can serve any number of
//! connections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ProtocolError;

pub mod fields;
pub mod packets;
pub mod registry;


/// Connection phase deciding which packet table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolState {
    #[default]
    Handshaking,
    Status,
    Login,
    Play,
    Transfer,
}

impl ProtocolState {
    pub const ALL: [ProtocolState; 5] = [
        ProtocolState::Handshaking,
        ProtocolState::Status,
        ProtocolState::Login,
        ProtocolState::Play,
        ProtocolState::Transfer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolState::Handshaking => "Handshaking",
            ProtocolState::Status => "Status",
            ProtocolState::Login => "Login",
            ProtocolState::Play => "Play",
            ProtocolState::Transfer => "Transfer",
        }
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolError::ConfigError(format!("Unknown protocol state: {s}")))
    }
}

/// Which way a packet travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to server.
    Serverbound,
    /// Server to client.
    Clientbound,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Serverbound => "serverbound",
            Direction::Clientbound => "clientbound",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Serverbound => Direction::Clientbound,
            Direction::Clientbound => Direction::Serverbound,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serverbound" => Ok(Direction::Serverbound),
            "clientbound" => Ok(Direction::Clientbound),
            _ => Err(ProtocolError::ConfigError(format!("Unknown direction: {s}"))),
        }
    }
}

/// Which end of the connection this endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Client,
    Server,
}

impl Side {
    /// Direction of packets this side sends.
    pub fn outbound(self) -> Direction {
        match self {
            Side::Client => Direction::Serverbound,
            Side::Server => Direction::Clientbound,
        }
    }

    /// Direction of packets this side receives.
    pub fn inbound(self) -> Direction {
        self.outbound().opposite()
    }
}
