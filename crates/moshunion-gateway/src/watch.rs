//! `moshunion-gateway watch`: follow one tour from the command line.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use moshunion_channels::{run_subscription, ChannelError, ReconnectPolicy, SubscriptionTransport};
use moshunion_core::{config::MoshConfig, TourId};
use moshunion_protocol::frames::{ClientFrame, JoinParams, ServerFrame};
use tokio::{net::TcpStream, sync::watch};
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A gateway WebSocket that joins one tour on every (re)connect.
pub struct WsTransport {
    url: String,
    name: Option<String>,
    stream: Option<WsStream>,
}

impl WsTransport {
    pub fn new(url: impl Into<String>, name: Option<String>) -> Self {
        Self {
            url: url.into(),
            name,
            stream: None,
        }
    }
}

#[async_trait]
impl SubscriptionTransport for WsTransport {
    fn name(&self) -> &str {
        "ws"
    }

    async fn open(&mut self, tour_id: &TourId) -> Result<(), ChannelError> {
        self.stream = None;
        let (mut stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;

        let join = ClientFrame::Join(JoinParams {
            tour_id: tour_id.clone(),
            name: self.name.clone(),
            init: None,
        });
        let text = serde_json::to_string(&join).map_err(|e| ChannelError::SendFailed(e.to_string()))?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| ChannelError::SendFailed(e.to_string()))?;

        self.stream = Some(stream);
        Ok(())
    }

    async fn next_message(&mut self) -> Option<Result<String, ChannelError>> {
        let stream = self.stream.as_mut()?;
        loop {
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Close(_))) | None => {
                    self.stream = None;
                    return None;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    self.stream = None;
                    return Some(Err(ChannelError::ConnectionFailed(e.to_string())));
                }
            }
        }
    }
}

/// Log one pushed frame in human-readable form.
pub fn log_frame(text: &str) {
    match serde_json::from_str::<ServerFrame>(text) {
        Ok(ServerFrame::Snapshot(s)) => info!(
            seq = s.seq,
            tour_id = %s.tour_id,
            attendance = s.capacity.current_attendance,
            capacity = s.capacity.venue_capacity,
            percentage = s.capacity.capacity_percentage,
            status = ?s.capacity.status,
            energy = s.energy.energy_level,
            energy_status = ?s.energy.energy_status,
            "snapshot"
        ),
        Ok(ServerFrame::Presence(p)) => info!(tour_id = %p.tour_id, viewers = p.viewers, "presence"),
        Ok(ServerFrame::Chat(c)) => info!(tour_id = %c.tour_id, from = %c.from, "{}", c.text),
        Ok(ServerFrame::Error(e)) => warn!(code = %e.code, "{}", e.message),
        Ok(other) => debug!(kind = other.kind(), "frame"),
        Err(e) => warn!(error = %e, "unreadable frame"),
    }
}

/// Subscribe until Ctrl-C or the reconnect policy gives up.
pub async fn run(config: &MoshConfig, url: String, tour: String, name: Option<String>) -> anyhow::Result<()> {
    let tour_id = TourId::from(tour);
    let policy = ReconnectPolicy::from_config(&config.reconnect);
    let mut transport = WsTransport::new(url.clone(), name);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    info!(url = %url, tour_id = %tour_id, "watching tour");
    run_subscription(&mut transport, &tour_id, &policy, |text| log_frame(&text), shutdown_rx).await?;
    info!("watch stopped");
    Ok(())
}
