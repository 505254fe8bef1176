use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use moshunion_channels::{ConnLifecycle, QueueSubscriber};
use moshunion_core::{
    config::{HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES},
    ConnId, MoshError,
};
use moshunion_protocol::{frames::ServerFrame, hello::Hello};
use std::sync::{atomic::Ordering, Arc};
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::{message, send};

/// Axum handler: upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(MAX_PAYLOAD_BYTES * 4)
        .on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop: lives for the entire WS session.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let lifecycle = Arc::new(ConnLifecycle::new());
    let (subscriber, mut outbound) = QueueSubscriber::new(
        conn_id.clone(),
        state.config.broadcast.queue_depth,
        lifecycle.clone(),
    );
    let mut session = message::Session::new(Arc::new(subscriber));
    // Watch from before the hello so a shutdown racing the handshake is seen.
    let mut shutdown = state.shutdown.clone();

    let hello = ServerFrame::Hello(Hello::new(conn_id.clone(), env!("CARGO_PKG_VERSION")));
    if send::frame(&mut tx, &hello).await.is_err() {
        lifecycle.close();
        return;
    }
    lifecycle.open();
    state.ws_clients.fetch_add(1, Ordering::Relaxed);

    let mut heartbeat =
        tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // skip the immediate first tick
    heartbeat.tick().await;

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let size = text.as_str().len();
                        if size > MAX_PAYLOAD_BYTES {
                            warn!(conn_id = %conn_id, size, "payload too large");
                            let err = MoshError::PayloadTooLarge {
                                size,
                                max: MAX_PAYLOAD_BYTES,
                            };
                            send::close_with_error(&mut tx, &err).await;
                            break;
                        }
                        match message::handle(&mut session, text.as_str(), &state) {
                            Ok(replies) => {
                                let mut failed = false;
                                for reply in &replies {
                                    if send::frame(&mut tx, reply).await.is_err() {
                                        failed = true;
                                        break;
                                    }
                                }
                                if failed { break; }
                            }
                            Err(e) => {
                                send::close_with_error(&mut tx, &e).await;
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        warn!(conn_id = %conn_id, len = data.len(), "binary frame rejected");
                        let err = MoshError::Protocol("binary frames are not supported".into());
                        send::close_with_error(&mut tx, &err).await;
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = tx.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "WS read error");
                        break;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                }
            }

            pushed = outbound.recv() => {
                let Some(frame) = pushed else { break };
                if send::text(&mut tx, &frame).await.is_err() {
                    break;
                }
            }

            _ = heartbeat.tick() => {
                if tx.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }

    lifecycle.close();
    state.drop_connection(&conn_id);
    state.ws_clients.fetch_sub(1, Ordering::Relaxed);
    info!(conn_id = %conn_id, "WS connection closed");
}
