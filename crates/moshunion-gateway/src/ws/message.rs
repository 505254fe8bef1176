use chrono::Utc;
use moshunion_channels::Subscriber;
use moshunion_core::{ConnId, MoshError, TourId};
use moshunion_protocol::frames::{
    ChatParams, ChatPush, ClientFrame, JoinParams, ServerFrame, MAX_CHAT_CHARS,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

use crate::app::AppState;

/// Per-connection view of which rooms this socket sits in.
pub struct Session {
    pub conn_id: ConnId,
    subscriber: Arc<dyn Subscriber>,
    /// tour id → display name used for chat in that room
    joined: HashMap<TourId, String>,
}

impl Session {
    pub fn new(subscriber: Arc<dyn Subscriber>) -> Self {
        Self {
            conn_id: subscriber.conn_id().clone(),
            subscriber,
            joined: HashMap::new(),
        }
    }

    pub fn is_joined(&self, tour_id: &TourId) -> bool {
        self.joined.contains_key(tour_id)
    }

    fn guest_name(&self) -> String {
        let short: String = self.conn_id.as_str().chars().take(8).collect();
        format!("guest-{short}")
    }
}

/// Process one inbound text frame. Returns frames to send straight back to
/// this connection; room traffic goes through the hub.
///
/// `Err` means the frame broke the protocol and the connection must close.
/// Request-level failures come back as `error` frames in the `Ok` list.
pub fn handle(
    session: &mut Session,
    text: &str,
    app: &AppState,
) -> Result<Vec<ServerFrame>, MoshError> {
    let frame = ClientFrame::parse(text).map_err(|e| {
        warn!(conn_id = %session.conn_id, error = %e, "malformed frame");
        e
    })?;

    let result = match frame {
        ClientFrame::Join(params) => join(session, params, app),
        ClientFrame::Leave { tour_id } => Ok(leave(session, tour_id, app)),
        ClientFrame::Chat(params) => chat(session, params, app),
        ClientFrame::Ping => Ok(vec![ServerFrame::Pong {
            ts: Utc::now().timestamp_millis(),
        }]),
    };
    Ok(result.unwrap_or_else(|e| vec![ServerFrame::from_error(&e)]))
}

fn join(
    session: &mut Session,
    params: JoinParams,
    app: &AppState,
) -> Result<Vec<ServerFrame>, MoshError> {
    let JoinParams {
        tour_id,
        name,
        init,
    } = params;
    if tour_id.as_str().trim().is_empty() {
        return Err(MoshError::InvalidInput("tourId must not be empty".into()));
    }
    let record = app.store.get_or_create(&tour_id, init.as_ref())?;
    let viewers = app.join_room(&tour_id, session.subscriber.clone(), record)?;

    let name = name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| session.guest_name());
    info!(conn_id = %session.conn_id, tour_id = %tour_id, viewers, "joined tour");
    session.joined.insert(tour_id, name);
    Ok(Vec::new())
}

fn leave(session: &mut Session, tour_id: TourId, app: &AppState) -> Vec<ServerFrame> {
    session.joined.remove(&tour_id);
    if app.leave_room(&tour_id, &session.conn_id) {
        debug!(conn_id = %session.conn_id, tour_id = %tour_id, "left tour");
    }
    vec![ServerFrame::Left { tour_id }]
}

fn chat(
    session: &mut Session,
    params: ChatParams,
    app: &AppState,
) -> Result<Vec<ServerFrame>, MoshError> {
    let Some(from) = session.joined.get(&params.tour_id) else {
        return Err(MoshError::InvalidInput(format!(
            "join '{}' before chatting",
            params.tour_id
        )));
    };
    let text = params.text.trim();
    if text.is_empty() {
        return Err(MoshError::InvalidInput("chat text is empty".into()));
    }
    if text.chars().count() > MAX_CHAT_CHARS {
        return Err(MoshError::InvalidInput(format!(
            "chat text exceeds {MAX_CHAT_CHARS} characters"
        )));
    }

    let push = ServerFrame::Chat(ChatPush {
        tour_id: params.tour_id.clone(),
        from: from.clone(),
        text: text.to_string(),
        ts: Utc::now(),
    });
    app.store.touch(&params.tour_id);
    app.hub.publish(&params.tour_id, push.to_text().into());
    Ok(Vec::new())
}
