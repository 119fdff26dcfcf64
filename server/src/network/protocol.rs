// mmo_world_server/server/src/network/protocol.rs
use crate::core::error::{ServerError, ServerResult};
use crate::core::types::{PlayerId, Position};
use bytes::Bytes;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Carries a bare player id: assigned id (msg 1) and departure notice (msg 201).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncPid {
    pub pid: PlayerId,
}

/// Broadcast type tag. On the wire it is the numeric code, not the variant index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum BroadcastKind {
    Chat = 1,
    Spawn = 2,
    Action = 3,
    Moved = 4,
}

impl BroadcastKind {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for BroadcastKind {
    type Error = ServerError;

    fn try_from(code: i32) -> ServerResult<Self> {
        match code {
            1 => Ok(BroadcastKind::Chat),
            2 => Ok(BroadcastKind::Spawn),
            3 => Ok(BroadcastKind::Action),
            4 => Ok(BroadcastKind::Moved),
            other => Err(ServerError::DecodeError(format!("unknown broadcast type {}", other))),
        }
    }
}

impl Serialize for BroadcastKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

impl<'de> Deserialize<'de> for BroadcastKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i32::deserialize(deserializer)?;
        BroadcastKind::try_from(code).map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BroadcastData {
    Content(String),
    Position(Position),
    ActionData(i32),
}

/// Envelope for msg 200.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadCast {
    pub pid: PlayerId,
    pub tp: BroadcastKind,
    pub data: BroadcastData,
}

impl BroadCast {
    pub fn position(pid: PlayerId, tp: BroadcastKind, position: Position) -> Self {
        BroadCast { pid, tp, data: BroadcastData::Position(position) }
    }

    pub fn chat(pid: PlayerId, content: impl Into<String>) -> Self {
        BroadCast { pid, tp: BroadcastKind::Chat, data: BroadcastData::Content(content.into()) }
    }
}

/// Inbound chat line (msg 2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talk {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub pid: PlayerId,
    pub p: Position,
}

/// Players visible to a newcomer (msg 202).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SyncPlayers {
    pub ps: Vec<PlayerSnapshot>,
}

pub fn encode<T: Serialize>(payload: &T) -> ServerResult<Bytes> {
    bincode::serialize(payload)
        .map(Bytes::from)
        .map_err(|e| ServerError::EncodeError(e.to_string()))
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> ServerResult<T> {
    bincode::deserialize(data).map_err(|e| ServerError::DecodeError(e.to_string()))
}
