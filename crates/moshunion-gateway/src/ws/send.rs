use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use moshunion_core::MoshError;
use moshunion_protocol::frames::ServerFrame;

pub type WsSink = futures_util::stream::SplitSink<WebSocket, Message>;

/// Serialize a server frame and send it over the WS connection.
pub async fn frame(tx: &mut WsSink, frame: &ServerFrame) -> Result<(), axum::Error> {
    text(tx, &frame.to_text()).await
}

/// Send an already-serialized frame.
pub async fn text(tx: &mut WsSink, text: &str) -> Result<(), axum::Error> {
    tx.send(Message::Text(text.into()))
        .await
        .map_err(axum::Error::new)
}

/// Report `err` to the peer, then send a close frame. Best effort: the
/// connection is being torn down either way.
pub async fn close_with_error(tx: &mut WsSink, err: &MoshError) {
    if frame(tx, &ServerFrame::from_error(err)).await.is_ok() {
        let _ = tx.send(Message::Close(None)).await;
    }
}
