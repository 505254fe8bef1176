use moshunion_venue::VenueError;
use thiserror::Error;

/// Errors that can occur while processing one scheduler tick for one tour.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The store rejected the update (tour evicted mid-tick, bad record).
    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    /// The delivery channel is at capacity; this update was dropped.
    #[error("Delivery channel full")]
    DeliveryFull,

    /// The delivery side has gone away.
    #[error("Delivery channel closed")]
    DeliveryClosed,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
