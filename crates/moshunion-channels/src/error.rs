use thiserror::Error;

/// Errors raised while delivering to, or connecting, a subscription.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The peer is gone; the subscriber should be dropped.
    #[error("Connection closed")]
    Closed,

    /// The subscriber's outbound queue is full; this update is skipped.
    #[error("Outbound queue full")]
    Full,

    /// The connection has not finished opening yet.
    #[error("Connection not open")]
    NotOpen,

    /// The underlying transport could not be established.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A message could not be delivered to the remote endpoint.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// An operation exceeded its allowed time budget.
    #[error("Operation timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl ChannelError {
    /// Transient failures keep the subscriber; everything else removes it.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChannelError::Full)
    }
}
