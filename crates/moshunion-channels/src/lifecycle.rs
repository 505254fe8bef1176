use std::sync::atomic::{AtomicU8, Ordering};

/// Connection states: linear progression, no backwards transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Connecting,
    Open,
    Closed,
}

impl ConnState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ConnState::Connecting,
            1 => ConnState::Open,
            _ => ConnState::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnState::Connecting => 0,
            ConnState::Open => 1,
            ConnState::Closed => 2,
        }
    }
}

/// Shared, lock-free holder of one connection's [`ConnState`].
///
/// The transport task drives it (`open` once the handshake is done, `close`
/// on peer close, protocol error or explicit teardown) while the hub reads it
/// before every push.
#[derive(Debug)]
pub struct ConnLifecycle {
    state: AtomicU8,
}

impl ConnLifecycle {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnState::Connecting.as_u8()),
        }
    }

    pub fn get(&self) -> ConnState {
        ConnState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `Connecting → Open`. Returns `false` if the connection already left
    /// `Connecting`.
    pub fn open(&self) -> bool {
        self.state
            .compare_exchange(
                ConnState::Connecting.as_u8(),
                ConnState::Open.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Move to `Closed` from any state. Idempotent; returns `true` only for
    /// the call that performed the transition.
    pub fn close(&self) -> bool {
        self.state.swap(ConnState::Closed.as_u8(), Ordering::AcqRel) != ConnState::Closed.as_u8()
    }

    pub fn is_open(&self) -> bool {
        self.get() == ConnState::Open
    }
}

impl Default for ConnLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
