use moshunion_core::{
    config::{MAX_PAYLOAD_BYTES, PROTOCOL_VERSION},
    ConnId,
};
use serde::{Deserialize, Serialize};

/// Server → Client greeting, sent as soon as a connection opens.
/// Wire: `{ "type": "hello", "protocol": 1, "server": "moshunion", ... }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    pub protocol: u32,
    pub server: String,
    pub version: String,
    pub conn_id: ConnId,
    /// Largest client frame the server accepts, in bytes.
    pub max_frame_bytes: usize,
}

impl Hello {
    pub fn new(conn_id: ConnId, version: &str) -> Self {
        Self {
            protocol: PROTOCOL_VERSION,
            server: "moshunion".to_string(),
            version: version.to_string(),
            conn_id,
            max_frame_bytes: MAX_PAYLOAD_BYTES,
        }
    }
}
