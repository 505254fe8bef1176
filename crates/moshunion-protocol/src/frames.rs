use chrono::{DateTime, Utc};
use moshunion_core::{
    venue::{CrowdEnergySnapshot, TourParams, VenueCapacitySnapshot, VenueRealtimeRecord},
    MoshError, TourId,
};
use serde::{Deserialize, Serialize};

use crate::hello::Hello;

/// Longest chat line relayed to a room, in characters.
pub const MAX_CHAT_CHARS: usize = 500;

/// Client → Server.
/// Wire: `{ "type": "join", "tourId": "t-42", "name": "Lemmy" }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join(JoinParams),
    Leave {
        #[serde(rename = "tourId")]
        tour_id: TourId,
    },
    Chat(ChatParams),
    Ping,
}

impl ClientFrame {
    /// Parse one inbound text frame. Unknown `type`s and missing fields are
    /// protocol errors.
    pub fn parse(text: &str) -> Result<Self, MoshError> {
        serde_json::from_str(text).map_err(|e| MoshError::Protocol(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinParams {
    pub tour_id: TourId,
    /// Display name used for chat relays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Catalog parameters; lets a join lazily create an untracked tour.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<TourParams>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParams {
    pub tour_id: TourId,
    pub text: String,
}

/// Server → Client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Hello(Hello),
    Snapshot(SnapshotPush),
    Presence(PresencePush),
    Chat(ChatPush),
    Left {
        #[serde(rename = "tourId")]
        tour_id: TourId,
    },
    Pong {
        ts: i64,
    },
    Error(ErrorShape),
}

impl ServerFrame {
    pub fn snapshot(seq: u64, record: VenueRealtimeRecord) -> Self {
        ServerFrame::Snapshot(SnapshotPush::new(seq, record))
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerFrame::Error(ErrorShape {
            code: code.to_string(),
            message: message.into(),
        })
    }

    /// Map a core error onto the wire error shape.
    pub fn from_error(err: &MoshError) -> Self {
        Self::error(err.code(), err.to_string())
    }

    /// The `type` discriminator, also used as the SSE event name.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::Hello(_) => "hello",
            ServerFrame::Snapshot(_) => "snapshot",
            ServerFrame::Presence(_) => "presence",
            ServerFrame::Chat(_) => "chat",
            ServerFrame::Left { .. } => "left",
            ServerFrame::Pong { .. } => "pong",
            ServerFrame::Error(_) => "error",
        }
    }

    /// Serialize to the JSON text sent over the wire.
    pub fn to_text(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// `{ type: "snapshot", seq, tourId, capacity, energy }`: the realtime push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPush {
    /// Server-wide push sequence number.
    pub seq: u64,
    pub tour_id: TourId,
    pub capacity: VenueCapacitySnapshot,
    pub energy: CrowdEnergySnapshot,
}

impl SnapshotPush {
    pub fn new(seq: u64, record: VenueRealtimeRecord) -> Self {
        Self {
            seq,
            tour_id: record.tour_id,
            capacity: record.capacity,
            energy: record.energy,
        }
    }

    pub fn into_record(self) -> VenueRealtimeRecord {
        VenueRealtimeRecord {
            tour_id: self.tour_id,
            capacity: self.capacity,
            energy: self.energy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePush {
    pub tour_id: TourId,
    pub viewers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPush {
    pub tour_id: TourId,
    pub from: String,
    pub text: String,
    pub ts: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
}
