use chrono::{DateTime, Duration, Utc};
use dashmap::{mapref::entry::Entry as Slot, DashMap};
use moshunion_core::{
    config::{SeedMode, StoreConfig},
    venue::{TourParams, VenueRealtimeRecord},
    TourId,
};
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::{
    error::{Result, VenueError},
    generator, seed,
};

/// Ten years; keeps the TTL within chrono's representable range.
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 3600;

/// One tracked tour: its current record plus what is needed to evolve it.
struct Entry {
    record: VenueRealtimeRecord,
    /// `None` for records inserted through [`VenueStore::upsert`] without a
    /// prior `create`; such records never conclude.
    show_date: Option<DateTime<Utc>>,
    rng: StdRng,
    last_touched: DateTime<Utc>,
}

/// Latest realtime record per tour id, held in memory for the process lifetime
/// unless evicted.
///
/// Every mutation reads, computes and writes under the entry's `DashMap`
/// write guard, so there is a single writer per tour id and readers only ever
/// see complete records.
/// Records expire `ttl` after their last touch, and the least recently touched
/// record is dropped when `max_records` would be exceeded.
pub struct VenueStore {
    records: DashMap<TourId, Entry>,
    ttl: Duration,
    max_records: usize,
    seed_mode: SeedMode,
}

impl VenueStore {
    pub fn new(config: &StoreConfig, seed_mode: SeedMode) -> Self {
        let ttl_secs = i64::try_from(config.ttl_secs)
            .unwrap_or(MAX_TTL_SECS)
            .min(MAX_TTL_SECS);
        Self {
            records: DashMap::new(),
            ttl: Duration::seconds(ttl_secs),
            max_records: config.max_records.max(1),
            seed_mode,
        }
    }

    /// Generate and insert the initial record for a tour.
    ///
    /// Re-creating an existing tour regenerates it from the new parameters but
    /// carries its capacity percentage over.
    pub fn create(&self, tour_id: &TourId, params: &TourParams) -> Result<VenueRealtimeRecord> {
        let show_date = params.parse_show_date().ok_or_else(|| {
            VenueError::InvalidInput(format!("unparsable showDate '{}'", params.show_date))
        })?;
        let mut rng = seed::tour_rng(self.seed_mode, tour_id, params);

        let (record, regenerated) = match self.records.entry(tour_id.clone()) {
            Slot::Occupied(mut slot) => {
                let entry = slot.get_mut();
                let now = Utc::now();
                let prior = entry.record.capacity.capacity_percentage;
                let mut record =
                    generator::generate_snapshot(tour_id, params, Some(prior), now, &mut rng)?;
                if record.energy.last_update < entry.record.energy.last_update {
                    record.energy.last_update = entry.record.energy.last_update;
                }
                *entry = Entry {
                    record: record.clone(),
                    show_date: Some(show_date),
                    rng,
                    last_touched: now,
                };
                (record, true)
            }
            Slot::Vacant(slot) => {
                let now = Utc::now();
                let record = generator::generate_snapshot(tour_id, params, None, now, &mut rng)?;
                slot.insert(Entry {
                    record: record.clone(),
                    show_date: Some(show_date),
                    rng,
                    last_touched: now,
                });
                (record, false)
            }
        };
        self.enforce_bound();

        info!(
            tour_id = %tour_id,
            venue = %params.venue,
            band = %params.band_name,
            regenerated,
            "venue record created"
        );
        Ok(record)
    }

    /// Return the current record, creating it from `params` if absent.
    /// Counts as a touch.
    pub fn get_or_create(
        &self,
        tour_id: &TourId,
        params: Option<&TourParams>,
    ) -> Result<VenueRealtimeRecord> {
        if let Some(record) = self.touch_and_get(tour_id) {
            return Ok(record);
        }
        match params {
            Some(p) => self.create(tour_id, p),
            None => Err(VenueError::TourNotFound {
                id: tour_id.to_string(),
            }),
        }
    }

    /// Pure read; does not refresh recency.
    pub fn get(&self, tour_id: &TourId) -> Option<VenueRealtimeRecord> {
        self.records.get(tour_id).map(|e| e.record.clone())
    }

    /// Refresh recency. Returns `false` if the tour is not tracked.
    pub fn touch(&self, tour_id: &TourId) -> bool {
        match self.records.get_mut(tour_id) {
            Some(mut e) => {
                e.last_touched = Utc::now();
                true
            }
            None => false,
        }
    }

    fn touch_and_get(&self, tour_id: &TourId) -> Option<VenueRealtimeRecord> {
        self.records.get_mut(tour_id).map(|mut e| {
            e.last_touched = Utc::now();
            e.record.clone()
        })
    }

    /// Replace (or insert) a record wholesale.
    ///
    /// The record must be internally consistent and belong to `tour_id`.
    /// `lastUpdate` is never allowed to move backwards.
    pub fn upsert(&self, tour_id: &TourId, mut record: VenueRealtimeRecord) -> Result<()> {
        if record.tour_id != *tour_id {
            return Err(VenueError::InvalidInput(format!(
                "record for '{}' upserted under '{}'",
                record.tour_id, tour_id
            )));
        }
        if !record.is_consistent() {
            return Err(VenueError::InvalidInput(
                "record status fields disagree with their numeric sources".to_string(),
            ));
        }

        match self.records.entry(tour_id.clone()) {
            Slot::Occupied(mut slot) => {
                let e = slot.get_mut();
                if record.energy.last_update < e.record.energy.last_update {
                    record.energy.last_update = e.record.energy.last_update;
                }
                e.record = record;
                e.last_touched = Utc::now();
            }
            Slot::Vacant(slot) => {
                let params = TourParams {
                    venue: String::new(),
                    band_name: String::new(),
                    show_date: String::new(),
                };
                slot.insert(Entry {
                    record,
                    show_date: None,
                    rng: seed::tour_rng(self.seed_mode, tour_id, &params),
                    last_touched: Utc::now(),
                });
            }
        }
        self.enforce_bound();
        Ok(())
    }

    /// Apply one small random step to the tour's record and return the result.
    pub fn perturb(&self, tour_id: &TourId) -> Result<VenueRealtimeRecord> {
        let mut entry = self
            .records
            .get_mut(tour_id)
            .ok_or_else(|| VenueError::TourNotFound {
                id: tour_id.to_string(),
            })?;
        let now = Utc::now();
        let Entry { record, rng, .. } = &mut *entry;
        let next = generator::perturb(record, now, rng);
        *record = next.clone();
        entry.last_touched = now;
        Ok(next)
    }

    /// True once the tour's show is over. Unknown tours are not concluded.
    pub fn is_concluded(&self, tour_id: &TourId, now: DateTime<Utc>) -> bool {
        self.records
            .get(tour_id)
            .and_then(|e| e.show_date)
            .is_some_and(|d| generator::is_concluded(d, now))
    }

    /// Explicitly drop a tour. Returns `false` if it was not tracked.
    pub fn evict(&self, tour_id: &TourId) -> bool {
        let removed = self.records.remove(tour_id).is_some();
        if removed {
            info!(tour_id = %tour_id, "venue record evicted");
        }
        removed
    }

    /// Drop every record untouched for longer than the TTL. Returns the count.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(cutoff) = now.checked_sub_signed(self.ttl) else {
            return 0;
        };
        let before = self.records.len();
        self.records.retain(|id, e| {
            let keep = e.last_touched >= cutoff;
            if !keep {
                debug!(tour_id = %id, "venue record expired");
            }
            keep
        });
        before.saturating_sub(self.records.len())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, tour_id: &TourId) -> bool {
        self.records.contains_key(tour_id)
    }

    pub fn tour_ids(&self) -> Vec<TourId> {
        self.records.iter().map(|e| e.key().clone()).collect()
    }

    /// Runs after the entry guard is released: eviction walks every shard.
    fn enforce_bound(&self) {
        while self.records.len() > self.max_records {
            if !self.evict_least_recent() {
                break;
            }
        }
    }

    fn evict_least_recent(&self) -> bool {
        // Collect the key first: removing while an iterator guard is alive
        // would deadlock on the shard lock.
        let oldest = self
            .records
            .iter()
            .min_by_key(|e| e.last_touched)
            .map(|e| e.key().clone());
        match oldest {
            Some(id) => {
                info!(tour_id = %id, "venue store full, evicting least recently touched");
                self.records.remove(&id).is_some()
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moshunion_core::venue::{CrowdEnergySnapshot, VenueCapacitySnapshot};

    fn store(max_records: usize) -> VenueStore {
        VenueStore::new(
            &StoreConfig {
                ttl_secs: 60,
                max_records,
            },
            SeedMode::Deterministic,
        )
    }

    fn params(days_out: i64) -> TourParams {
        TourParams {
            venue: "Red Rocks Amphitheatre".into(),
            band_name: "Tool".into(),
            show_date: (Utc::now() + Duration::days(days_out)).to_rfc3339(),
        }
    }

    #[test]
    fn get_is_idempotent() {
        let s = store(10);
        let id = TourId::from("rr-1");
        s.create(&id, &params(10)).unwrap();
        assert_eq!(s.get(&id), s.get(&id));
    }

    #[test]
    fn invalid_date_creates_nothing() {
        let s = store(10);
        let id = TourId::from("bad");
        let p = TourParams {
            show_date: "32/13/2026".into(),
            ..params(1)
        };
        assert!(matches!(s.create(&id, &p), Err(VenueError::InvalidInput(_))));
        assert!(!s.contains(&id));
    }

    #[test]
    fn get_or_create_requires_params_for_unknown() {
        let s = store(10);
        let id = TourId::from("lazy");
        assert!(matches!(
            s.get_or_create(&id, None),
            Err(VenueError::TourNotFound { .. })
        ));
        let created = s.get_or_create(&id, Some(&params(3))).unwrap();
        assert_eq!(s.get_or_create(&id, None).unwrap(), created);
    }

    #[test]
    fn sequential_perturbs_have_monotonic_timestamps() {
        let s = store(10);
        let id = TourId::from("rr-2");
        let first = s.create(&id, &params(5)).unwrap();
        let a = s.perturb(&id).unwrap();
        let b = s.perturb(&id).unwrap();
        assert!(a.energy.last_update >= first.energy.last_update);
        assert!(b.energy.last_update >= a.energy.last_update);
        assert!(b.is_consistent());
        assert_eq!(s.get(&id).unwrap(), b);
    }

    #[test]
    fn perturb_unknown_tour_fails() {
        let s = store(10);
        assert!(matches!(
            s.perturb(&TourId::from("ghost")),
            Err(VenueError::TourNotFound { .. })
        ));
    }

    #[test]
    fn recreate_carries_capacity_over() {
        let s = store(10);
        let id = TourId::from("rr-3");
        let first = s.create(&id, &params(40)).unwrap();
        let again = s.create(&id, &params(2)).unwrap();
        assert_eq!(
            first.capacity.capacity_percentage,
            again.capacity.capacity_percentage
        );
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn recreate_never_rewinds_last_update() {
        let s = store(10);
        let id = TourId::from("rr-6");
        let mut current = s.create(&id, &params(5)).unwrap();
        let ahead = Utc::now() + Duration::minutes(10);
        current.energy.last_update = ahead;
        s.upsert(&id, current).unwrap();

        let again = s.create(&id, &params(5)).unwrap();
        assert_eq!(again.energy.last_update, ahead);
        assert_eq!(s.get(&id).unwrap().energy.last_update, ahead);
    }

    #[test]
    fn concurrent_recreate_and_perturb_keep_one_ordered_history() {
        let s = std::sync::Arc::new(store(10));
        let id = TourId::from("busy");
        s.create(&id, &params(5)).unwrap();

        let perturber = {
            let s = s.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                (0..200)
                    .map(|_| s.perturb(&id).unwrap().energy.last_update)
                    .collect::<Vec<_>>()
            })
        };
        let creator = {
            let s = s.clone();
            let id = id.clone();
            std::thread::spawn(move || {
                (0..200)
                    .map(|_| s.create(&id, &params(5)).unwrap().energy.last_update)
                    .collect::<Vec<_>>()
            })
        };
        let perturbed = perturber.join().unwrap();
        let created = creator.join().unwrap();

        for seq in [&perturbed, &created] {
            assert!(seq.windows(2).all(|w| w[0] <= w[1]));
        }
        let newest = perturbed.iter().chain(&created).max().copied().unwrap();
        assert_eq!(s.get(&id).unwrap().energy.last_update, newest);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn deterministic_mode_reproduces_initial_record() {
        let p = params(30);
        let id = TourId::from("same");
        let a = store(10).create(&id, &p).unwrap();
        let b = store(10).create(&id, &p).unwrap();
        assert_eq!(a.capacity, b.capacity);
        assert_eq!(a.energy.energy_level, b.energy.energy_level);
        assert_eq!(a.energy.metrics, b.energy.metrics);
    }

    #[test]
    fn upsert_rejects_inconsistent_record() {
        let s = store(10);
        let id = TourId::from("rr-4");
        let mut rec = s.create(&id, &params(5)).unwrap();
        rec.capacity.capacity_percentage = rec.capacity.capacity_percentage.wrapping_add(7);
        assert!(matches!(s.upsert(&id, rec), Err(VenueError::InvalidInput(_))));
    }

    #[test]
    fn upsert_never_rewinds_last_update() {
        let s = store(10);
        let id = TourId::from("rr-5");
        let current = s.create(&id, &params(5)).unwrap();
        let stale = VenueRealtimeRecord {
            tour_id: id.clone(),
            capacity: VenueCapacitySnapshot::new(1000, 500, 500),
            energy: CrowdEnergySnapshot::new(
                0.5,
                current.energy.metrics.clone(),
                current.energy.last_update - Duration::minutes(5),
            ),
        };
        s.upsert(&id, stale).unwrap();
        let stored = s.get(&id).unwrap();
        assert_eq!(stored.capacity.venue_capacity, 1000);
        assert_eq!(stored.energy.last_update, current.energy.last_update);
    }

    #[test]
    fn upsert_inserts_untracked_tour() {
        let s = store(10);
        let id = TourId::from("external");
        let rec = VenueRealtimeRecord {
            tour_id: id.clone(),
            capacity: VenueCapacitySnapshot::new(2000, 1500, 1500),
            energy: CrowdEnergySnapshot::new(
                0.3,
                moshunion_core::venue::EnergyMetrics {
                    social_buzz: 0.3,
                    review_sentiment: 0.3,
                    anticipation_score: 0.3,
                    band_popularity: 0.3,
                },
                Utc::now(),
            ),
        };
        s.upsert(&id, rec).unwrap();
        assert!(s.perturb(&id).unwrap().is_consistent());
        assert!(!s.is_concluded(&id, Utc::now() + Duration::days(1000)));
    }

    #[test]
    fn ttl_expiry_and_explicit_evict() {
        let s = store(10);
        let old = TourId::from("old");
        let kept = TourId::from("kept");
        s.create(&old, &params(5)).unwrap();
        s.create(&kept, &params(5)).unwrap();

        assert_eq!(s.evict_expired(Utc::now()), 0);
        assert_eq!(s.evict_expired(Utc::now() + Duration::seconds(61)), 2);
        assert!(s.is_empty());

        s.create(&kept, &params(5)).unwrap();
        assert!(s.evict(&kept));
        assert!(!s.evict(&kept));
    }

    #[test]
    fn lru_bound_drops_least_recently_touched() {
        let s = store(2);
        let a = TourId::from("a");
        let b = TourId::from("b");
        let c = TourId::from("c");
        s.create(&a, &params(5)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        s.create(&b, &params(5)).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(s.touch(&a));
        std::thread::sleep(std::time::Duration::from_millis(5));
        s.create(&c, &params(5)).unwrap();

        assert_eq!(s.len(), 2);
        assert!(s.contains(&a));
        assert!(!s.contains(&b));
        assert!(s.contains(&c));
    }

    #[test]
    fn concluded_show_detection() {
        let s = store(10);
        let past = TourId::from("past");
        let future = TourId::from("future");
        s.create(&past, &params(-3)).unwrap();
        s.create(&future, &params(3)).unwrap();
        assert!(s.is_concluded(&past, Utc::now()));
        assert!(!s.is_concluded(&future, Utc::now()));
        assert!(!s.is_concluded(&TourId::from("nope"), Utc::now()));
    }
}
