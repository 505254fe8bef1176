use moshunion_channels::BroadcastHub;
use moshunion_core::TourId;

/// Source of the tours the scheduler should advance on each tick.
pub trait TourRoster: Send + Sync {
    /// Tours with at least one open subscriber.
    fn watched_tours(&self) -> Vec<TourId>;
}

impl TourRoster for BroadcastHub {
    fn watched_tours(&self) -> Vec<TourId> {
        self.active_tours()
    }
}

impl TourRoster for Vec<TourId> {
    fn watched_tours(&self) -> Vec<TourId> {
        self.clone()
    }
}
