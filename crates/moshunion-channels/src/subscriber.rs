use std::sync::Arc;

use moshunion_core::ConnId;
use tokio::sync::mpsc;

use crate::{
    error::ChannelError,
    lifecycle::{ConnLifecycle, ConnState},
};

/// One push target registered with the [`BroadcastHub`](crate::hub::BroadcastHub).
///
/// `push` must never block: the hub calls it from the scheduler's delivery
/// path, and a slow peer must not delay anyone else.
pub trait Subscriber: Send + Sync {
    fn conn_id(&self) -> &ConnId;

    fn state(&self) -> ConnState;

    /// Hand one serialized frame to the transport.
    ///
    /// [`ChannelError::Full`] means this frame was dropped but the subscriber
    /// stays; any other error removes it from the hub.
    fn push(&self, frame: Arc<str>) -> Result<(), ChannelError>;
}

/// A subscriber backed by a bounded queue that a transport task drains.
///
/// The WebSocket and SSE handlers both own the receiving half and forward
/// whatever arrives to their peer.
pub struct QueueSubscriber {
    conn_id: ConnId,
    tx: mpsc::Sender<Arc<str>>,
    lifecycle: Arc<ConnLifecycle>,
}

impl QueueSubscriber {
    /// Create the subscriber and the receiver its transport should drain.
    pub fn new(
        conn_id: ConnId,
        depth: usize,
        lifecycle: Arc<ConnLifecycle>,
    ) -> (Self, mpsc::Receiver<Arc<str>>) {
        let (tx, rx) = mpsc::channel(depth.max(1));
        (
            Self {
                conn_id,
                tx,
                lifecycle,
            },
            rx,
        )
    }

    pub fn lifecycle(&self) -> &Arc<ConnLifecycle> {
        &self.lifecycle
    }
}

impl Subscriber for QueueSubscriber {
    fn conn_id(&self) -> &ConnId {
        &self.conn_id
    }

    fn state(&self) -> ConnState {
        self.lifecycle.get()
    }

    fn push(&self, frame: Arc<str>) -> Result<(), ChannelError> {
        match self.lifecycle.get() {
            ConnState::Connecting => return Err(ChannelError::NotOpen),
            ConnState::Closed => return Err(ChannelError::Closed),
            ConnState::Open => {}
        }
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => ChannelError::Full,
            mpsc::error::TrySendError::Closed(_) => {
                self.lifecycle.close();
                ChannelError::Closed
            }
        })
    }
}
