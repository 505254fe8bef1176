use axum::{
    routing::{get, post},
    Router,
};
use moshunion_channels::{BroadcastHub, ChannelError, Subscriber};
use moshunion_core::{config::MoshConfig, venue::VenueRealtimeRecord, ConnId, MoshError, TourId};
use moshunion_protocol::frames::{PresencePush, ServerFrame};
use moshunion_venue::VenueStore;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: MoshConfig,
    pub event_seq: AtomicU64,
    pub store: Arc<VenueStore>,
    pub hub: Arc<BroadcastHub>,
    /// Open WebSocket connections.
    pub ws_clients: AtomicUsize,
    /// Flips to `true` on Ctrl-C; long-lived connections watch it.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(config: MoshConfig, shutdown: watch::Receiver<bool>) -> Self {
        let store = Arc::new(VenueStore::new(&config.store, config.venue.seed_mode));
        Self {
            config,
            event_seq: AtomicU64::new(0),
            store,
            hub: Arc::new(BroadcastHub::new()),
            ws_clients: AtomicUsize::new(0),
            shutdown,
        }
    }

    /// Monotonically increasing sequence for snapshot pushes.
    pub fn next_seq(&self) -> u64 {
        self.event_seq.fetch_add(1, Ordering::Relaxed)
    }

    pub fn snapshot_frame(&self, record: VenueRealtimeRecord) -> Arc<str> {
        ServerFrame::snapshot(self.next_seq(), record).to_text().into()
    }

    /// Subscribe `sub` to a tour with `record` as its first frame, then tell
    /// the room its new size.
    pub fn join_room(
        &self,
        tour_id: &TourId,
        sub: Arc<dyn Subscriber>,
        record: VenueRealtimeRecord,
    ) -> Result<usize, MoshError> {
        let conn_id = sub.conn_id().clone();
        let viewers = self
            .hub
            .subscribe(tour_id, sub, self.snapshot_frame(record))
            .map_err(|e| {
                warn!(conn_id = %conn_id, tour_id = %tour_id, error = %e, "join rejected");
                match e {
                    ChannelError::Full | ChannelError::NotOpen => MoshError::Busy(e.to_string()),
                    other => MoshError::Internal(other.to_string()),
                }
            })?;
        self.announce_presence(tour_id);
        Ok(viewers)
    }

    /// Returns `false` if the connection was not in the room.
    pub fn leave_room(&self, tour_id: &TourId, conn_id: &ConnId) -> bool {
        let left = self.hub.unsubscribe(tour_id, conn_id);
        if left {
            self.announce_presence(tour_id);
        }
        left
    }

    /// Remove a closing connection from every room it joined.
    pub fn drop_connection(&self, conn_id: &ConnId) {
        for tour_id in self.hub.drop_connection(conn_id) {
            self.announce_presence(&tour_id);
        }
    }

    pub fn announce_presence(&self, tour_id: &TourId) {
        let viewers = self.hub.viewer_count(tour_id);
        if viewers == 0 {
            return;
        }
        let frame = ServerFrame::Presence(PresencePush {
            tour_id: tour_id.clone(),
            viewers,
        });
        self.hub.publish(tour_id, frame.to_text().into());
    }
}

/// Fan scheduler updates out to each tour's subscribers until the scheduler
/// drops its sender.
pub async fn run_delivery(state: Arc<AppState>, mut updates_rx: mpsc::Receiver<VenueRealtimeRecord>) {
    while let Some(record) = updates_rx.recv().await {
        let tour_id = record.tour_id.clone();
        let report = state.hub.publish(&tour_id, state.snapshot_frame(record));
        debug!(
            tour_id = %tour_id,
            delivered = report.delivered,
            dropped = report.dropped,
            removed = report.removed,
            "snapshot delivered"
        );
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .route("/tours", post(crate::http::tours::create_tour))
        .route(
            "/tours/{id}",
            get(crate::http::tours::get_tour).delete(crate::http::tours::delete_tour),
        )
        .route("/tours/{id}/events", get(crate::http::events::tour_events))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Fresh state with default config; keep the sender alive for the test.
#[cfg(test)]
pub(crate) fn test_state() -> (Arc<AppState>, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    (Arc::new(AppState::new(MoshConfig::default(), rx)), tx)
}
