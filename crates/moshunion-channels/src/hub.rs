use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use moshunion_core::{ConnId, TourId};
use tracing::{debug, warn};

use crate::{error::ChannelError, lifecycle::ConnState, subscriber::Subscriber};

/// Outcome of one [`BroadcastHub::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Subscribers that accepted the frame.
    pub delivered: usize,
    /// Subscribers whose queue was full; they stay registered.
    pub dropped: usize,
    /// Subscribers removed because their connection failed.
    pub removed: usize,
}

/// Tour-keyed registry of live subscribers.
///
/// Pushes never hold a map lock while calling into a subscriber: the room is
/// snapshotted, the lock released, and failures cleaned up afterwards.
pub struct BroadcastHub {
    rooms: DashMap<TourId, HashMap<ConnId, Arc<dyn Subscriber>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Register `sub` for `tour_id` after delivering `initial` to it.
    ///
    /// The subscriber must already be open, and the initial frame (normally
    /// the current snapshot) always precedes any published update. Returns
    /// the room's viewer count after registration.
    pub fn subscribe(
        &self,
        tour_id: &TourId,
        sub: Arc<dyn Subscriber>,
        initial: Arc<str>,
    ) -> Result<usize, ChannelError> {
        if sub.state() != ConnState::Open {
            return Err(ChannelError::NotOpen);
        }
        // Holding the room entry while pushing the initial frame keeps a
        // concurrent publish from overtaking it.
        let mut room = self.rooms.entry(tour_id.clone()).or_default();
        if let Err(e) = sub.push(initial) {
            let empty = room.is_empty();
            drop(room);
            if empty {
                self.rooms.remove_if(tour_id, |_, r| r.is_empty());
            }
            return Err(e);
        }
        room.insert(sub.conn_id().clone(), sub);
        let viewers = room.len();
        debug!(tour_id = %tour_id, viewers, "subscriber joined");
        Ok(viewers)
    }

    /// Remove one subscription. Idempotent; returns whether it existed.
    pub fn unsubscribe(&self, tour_id: &TourId, conn_id: &ConnId) -> bool {
        let removed = match self.rooms.get_mut(tour_id) {
            Some(mut room) => room.remove(conn_id).is_some(),
            None => return false,
        };
        self.rooms.remove_if(tour_id, |_, r| r.is_empty());
        removed
    }

    /// Remove a connection from every room it joined. Returns those tours.
    pub fn drop_connection(&self, conn_id: &ConnId) -> Vec<TourId> {
        let mut left = Vec::new();
        for mut room in self.rooms.iter_mut() {
            if room.value_mut().remove(conn_id).is_some() {
                left.push(room.key().clone());
            }
        }
        for tour_id in &left {
            self.rooms.remove_if(tour_id, |_, r| r.is_empty());
        }
        left.sort();
        left
    }

    /// Push `frame` to every open subscriber of `tour_id`.
    ///
    /// A full queue skips that subscriber for this frame only; a failed
    /// subscriber is removed and never affects delivery to the others.
    pub fn publish(&self, tour_id: &TourId, frame: Arc<str>) -> DeliveryReport {
        let targets: Vec<Arc<dyn Subscriber>> = match self.rooms.get(tour_id) {
            Some(room) => room.values().cloned().collect(),
            None => return DeliveryReport::default(),
        };

        let mut report = DeliveryReport::default();
        let mut failed: Vec<Arc<dyn Subscriber>> = Vec::new();
        for sub in targets {
            if sub.state() == ConnState::Connecting {
                continue;
            }
            match sub.push(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(e) if e.is_transient() => {
                    report.dropped += 1;
                    debug!(tour_id = %tour_id, conn_id = %sub.conn_id(), "queue full, update skipped");
                }
                Err(e) => {
                    warn!(tour_id = %tour_id, conn_id = %sub.conn_id(), error = %e, "removing failed subscriber");
                    failed.push(sub);
                }
            }
        }

        if !failed.is_empty() {
            if let Some(mut room) = self.rooms.get_mut(tour_id) {
                for sub in &failed {
                    // only remove the instance that failed, not a newer re-join
                    let same = room
                        .get(sub.conn_id())
                        .is_some_and(|cur| Arc::ptr_eq(cur, sub));
                    if same {
                        room.remove(sub.conn_id());
                        report.removed += 1;
                    }
                }
            }
            self.rooms.remove_if(tour_id, |_, r| r.is_empty());
        }
        report
    }

    /// Number of subscribers currently registered for `tour_id`.
    pub fn viewer_count(&self, tour_id: &TourId) -> usize {
        self.rooms.get(tour_id).map(|r| r.len()).unwrap_or(0)
    }

    /// Tours with at least one open subscriber, sorted.
    pub fn active_tours(&self) -> Vec<TourId> {
        let mut tours: Vec<TourId> = self
            .rooms
            .iter()
            .filter(|room| room.values().any(|s| s.state() == ConnState::Open))
            .map(|room| room.key().clone())
            .collect();
        tours.sort();
        tours
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
