use std::{sync::Arc, time::Duration};

use chrono::Utc;
use moshunion_venue::VenueStore;
use tokio::{sync::watch, time::MissedTickBehavior};
use tracing::info;

/// Reclaims store records that have gone untouched for longer than the TTL.
///
/// Runs on its own timer; its period is unrelated to the update tick.
pub struct Sweeper {
    store: Arc<VenueStore>,
    period: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<VenueStore>, period: Duration) -> Self {
        Self {
            store,
            period: period.max(Duration::from_millis(1)),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_secs = self.period.as_secs(), "store sweeper started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // the immediate first tick would sweep an empty store
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("store sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// One sweep pass. Returns how many records were evicted.
    pub fn sweep(&self) -> usize {
        let evicted = self.store.evict_expired(Utc::now());
        if evicted > 0 {
            info!(evicted, remaining = self.store.len(), "expired venue records swept");
        }
        evicted
    }
}
