use std::{sync::Arc, time::Duration};

use chrono::Utc;
use moshunion_core::{venue::VenueRealtimeRecord, TourId};
use moshunion_venue::VenueStore;
use tokio::{
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::{
    error::{Result, SchedulerError},
    roster::TourRoster,
};

/// Counters for a single tick, mostly useful to tests and debug logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub perturbed: usize,
    /// Tours left untouched because their show has concluded.
    pub frozen: usize,
    /// Watched tours no longer in the store (evicted while subscribed).
    pub missing: usize,
    pub failed: usize,
}

/// Update scheduler: on every tick, advances each watched tour by one
/// perturbation step and forwards the new record for delivery.
pub struct SchedulerEngine {
    store: Arc<VenueStore>,
    roster: Arc<dyn TourRoster>,
    /// Updated records go here; the receiver fans them out to subscribers.
    updates_tx: mpsc::Sender<VenueRealtimeRecord>,
    period: Duration,
}

impl SchedulerEngine {
    /// The sender is fed with `try_send` so the tick loop is never stalled by
    /// a slow consumer.
    pub fn new(
        store: Arc<VenueStore>,
        roster: Arc<dyn TourRoster>,
        updates_tx: mpsc::Sender<VenueRealtimeRecord>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            roster,
            updates_tx,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// Main loop. Ticks every `period` until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(period_ms = self.period.as_millis() as u64, "scheduler engine started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick();
                    if report != TickReport::default() {
                        debug!(
                            perturbed = report.perturbed,
                            frozen = report.frozen,
                            missing = report.missing,
                            failed = report.failed,
                            "scheduler tick"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Process every watched tour once. A failure on one tour is logged and
    /// never stops the others.
    pub fn tick(&self) -> TickReport {
        let now = Utc::now();
        let mut report = TickReport::default();

        for tour_id in self.roster.watched_tours() {
            if !self.store.contains(&tour_id) {
                report.missing += 1;
                continue;
            }
            if self.store.is_concluded(&tour_id, now) {
                report.frozen += 1;
                continue;
            }
            match self.advance(&tour_id) {
                Ok(()) => report.perturbed += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!(tour_id = %tour_id, error = %e, "tick skipped for tour");
                }
            }
        }
        report
    }

    fn advance(&self, tour_id: &TourId) -> Result<()> {
        let record = self.store.perturb(tour_id)?;
        self.updates_tx.try_send(record).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SchedulerError::DeliveryFull,
            mpsc::error::TrySendError::Closed(_) => SchedulerError::DeliveryClosed,
        })
    }
}
