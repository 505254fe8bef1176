use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use moshunion_channels::{ConnLifecycle, QueueSubscriber};
use moshunion_core::{ConnId, TourId};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

use super::ApiError;
use crate::app::AppState;

/// GET /tours/{id}/events: the same pushes a WebSocket viewer gets, as
/// Server-Sent Events named after each frame's `type`.
pub async fn tour_events(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>>>, ApiError>
{
    let tour_id = TourId::from(id);
    let record = state.store.get_or_create(&tour_id, None)?;

    let conn_id = ConnId::new();
    let lifecycle = Arc::new(ConnLifecycle::new());
    let (sub, mut rx) = QueueSubscriber::new(
        conn_id.clone(),
        state.config.broadcast.queue_depth,
        lifecycle.clone(),
    );
    lifecycle.open();
    state.join_room(&tour_id, Arc::new(sub), record)?;
    info!(conn_id = %conn_id, tour_id = %tour_id, "SSE subscriber joined");

    let guard = RoomGuard {
        state: state.clone(),
        tour_id,
        conn_id,
        lifecycle,
    };
    let mut shutdown = state.shutdown.clone();

    let stream = async_stream::stream! {
        // leaves the room when the client disconnects and axum drops the stream
        let _guard = guard;
        loop {
            let next = tokio::select! {
                frame = rx.recv() => frame,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        None
                    } else {
                        continue;
                    }
                }
            };
            let Some(frame) = next else { break };
            let event = Event::default().data(&*frame);
            yield Ok(match frame_kind(&frame) {
                Some(kind) => event.event(kind),
                None => event,
            });
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

struct RoomGuard {
    state: Arc<AppState>,
    tour_id: TourId,
    conn_id: ConnId,
    lifecycle: Arc<ConnLifecycle>,
}

impl Drop for RoomGuard {
    fn drop(&mut self) {
        self.lifecycle.close();
        self.state.leave_room(&self.tour_id, &self.conn_id);
        debug!(conn_id = %self.conn_id, tour_id = %self.tour_id, "SSE subscriber left");
    }
}

#[derive(Deserialize)]
struct FrameKind {
    #[serde(rename = "type")]
    kind: String,
}

/// The `type` discriminator of a serialized server frame.
fn frame_kind(frame: &str) -> Option<String> {
    serde_json::from_str::<FrameKind>(frame).ok().map(|f| f.kind)
}
