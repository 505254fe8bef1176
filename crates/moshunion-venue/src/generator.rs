//! Metric generator: turns tour parameters into capacity and crowd-energy
//! snapshots, and applies the small per-tick perturbation.
//!
//! Pure apart from the injected random generator: no I/O, no shared state.

use chrono::{DateTime, Duration, Utc};
use moshunion_core::{
    venue::{
        clamp01, round2, CrowdEnergySnapshot, EnergyMetrics, TourParams, VenueCapacitySnapshot,
        VenueRealtimeRecord,
    },
    TourId,
};
use rand::Rng;

use crate::{
    error::{Result, VenueError},
    tables,
};

/// Range of the initial `baseAttendance` draw (fraction of capacity).
const BASE_ATTENDANCE_MIN: f64 = 0.70;
const BASE_ATTENDANCE_MAX: f64 = 0.95;
/// Live headcount jitter around current attendance.
const ATTENDEE_JITTER_MIN: f64 = 0.95;
const ATTENDEE_JITTER_MAX: f64 = 1.05;
/// Per-tick perturbation bounds.
const ATTENDANCE_STEP: f64 = 0.01;
const ENERGY_STEP: f64 = 0.025;

/// Generate the initial record for a tour.
///
/// `prior_capacity_percentage` replaces the `baseAttendance` draw when a tour
/// is regenerated, so its attendance carries over.
///
/// Fails with [`VenueError::InvalidInput`] when `show_date` is unparsable.
pub fn generate_snapshot(
    tour_id: &TourId,
    params: &TourParams,
    prior_capacity_percentage: Option<u8>,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> Result<VenueRealtimeRecord> {
    let show_date = params.parse_show_date().ok_or_else(|| {
        VenueError::InvalidInput(format!("unparsable showDate '{}'", params.show_date))
    })?;

    let capacity = generate_capacity(&params.venue, prior_capacity_percentage, rng);
    let energy = generate_energy(
        &params.band_name,
        &params.venue,
        show_date,
        capacity.capacity_percentage,
        now,
        rng,
    );

    Ok(VenueRealtimeRecord {
        tour_id: tour_id.clone(),
        capacity,
        energy,
    })
}

pub fn generate_capacity(
    venue: &str,
    prior_capacity_percentage: Option<u8>,
    rng: &mut impl Rng,
) -> VenueCapacitySnapshot {
    let venue_capacity = tables::venue_capacity(venue);
    let base_attendance = match prior_capacity_percentage {
        Some(pct) => f64::from(pct.min(100)) / 100.0,
        None => rng.gen_range(BASE_ATTENDANCE_MIN..BASE_ATTENDANCE_MAX),
    };
    let current_attendance = (f64::from(venue_capacity) * base_attendance).floor() as u32;
    let attendee_count = jitter_headcount(current_attendance, rng);
    VenueCapacitySnapshot::new(venue_capacity, current_attendance, attendee_count)
}

pub fn generate_energy(
    band_name: &str,
    venue: &str,
    show_date: DateTime<Utc>,
    capacity_percentage: u8,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> CrowdEnergySnapshot {
    let band_popularity = tables::band_popularity(band_name, rng);
    let venue_prestige = tables::venue_prestige(venue, rng);
    let time_factor = time_factor(days_until_show(show_date, now));
    let capacity_factor = (f64::from(capacity_percentage) / 100.0).min(1.0);

    let social_buzz = clamp01(
        (0.4 * band_popularity + 0.3 * venue_prestige + 0.3 * capacity_factor)
            * rng.gen_range(0.8..1.2),
    );
    let review_sentiment = clamp01(0.7 + 0.2 * band_popularity + rng.gen_range(0.0..0.2));
    let anticipation_score =
        clamp01((0.5 * time_factor + 0.5 * capacity_factor) * rng.gen_range(0.6..1.0));
    let energy_level = clamp01(
        0.3 * social_buzz + 0.2 * review_sentiment + 0.3 * anticipation_score + 0.2 * band_popularity,
    );

    let metrics = EnergyMetrics {
        social_buzz: round2(social_buzz),
        review_sentiment: round2(review_sentiment),
        anticipation_score: round2(anticipation_score),
        band_popularity: round2(band_popularity),
    };
    CrowdEnergySnapshot::new(energy_level, metrics, now)
}

/// Whole days until the show, rounded up. Negative once the show is past.
pub fn days_until_show(show_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (show_date - now).num_milliseconds() as f64;
    (millis / Duration::days(1).num_milliseconds() as f64).ceil() as i64
}

/// Step function: no interpolation between buckets.
pub fn time_factor(days_until_show: i64) -> f64 {
    match days_until_show {
        d if d <= 1 => 1.0,
        d if d <= 7 => 0.9,
        d if d <= 30 => 0.7,
        d if d <= 90 => 0.5,
        _ => 0.3,
    }
}

/// A show is concluded a full day after its start time. Dates too close to
/// the end of the calendar for that day to exist never conclude.
pub fn is_concluded(show_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    show_date
        .checked_add_signed(Duration::days(1))
        .is_some_and(|end| now > end)
}

/// Random inputs of one perturbation step.
#[derive(Debug, Clone, Copy)]
pub struct PerturbDraws {
    /// Relative attendance change in `[-0.01, 0.01]`.
    pub attendance_step: f64,
    /// Headcount ratio in `[0.95, 1.05]`.
    pub attendee_ratio: f64,
    /// Absolute energy change in `[-0.025, 0.025]`.
    pub energy_step: f64,
}

impl PerturbDraws {
    pub fn draw(rng: &mut impl Rng) -> Self {
        Self {
            attendance_step: rng.gen_range(-ATTENDANCE_STEP..=ATTENDANCE_STEP),
            attendee_ratio: rng.gen_range(ATTENDEE_JITTER_MIN..=ATTENDEE_JITTER_MAX),
            energy_step: rng.gen_range(-ENERGY_STEP..=ENERGY_STEP),
        }
    }
}

/// Nudge an existing record instead of regenerating it.
pub fn perturb(
    record: &VenueRealtimeRecord,
    now: DateTime<Utc>,
    rng: &mut impl Rng,
) -> VenueRealtimeRecord {
    perturb_with(record, PerturbDraws::draw(rng), now)
}

/// Deterministic core of [`perturb`]. Derived statuses are recomputed and
/// `last_update` never moves backwards.
pub fn perturb_with(
    record: &VenueRealtimeRecord,
    draws: PerturbDraws,
    now: DateTime<Utc>,
) -> VenueRealtimeRecord {
    let cap = &record.capacity;
    let attendance = (f64::from(cap.current_attendance) * (1.0 + draws.attendance_step))
        .round()
        .clamp(0.0, f64::from(cap.venue_capacity)) as u32;
    let attendee_count = (f64::from(attendance) * draws.attendee_ratio).floor() as u32;
    let capacity = VenueCapacitySnapshot::new(cap.venue_capacity, attendance, attendee_count);

    let last_update = now.max(record.energy.last_update);
    let energy = CrowdEnergySnapshot::new(
        record.energy.energy_level + draws.energy_step,
        record.energy.metrics.clone(),
        last_update,
    );

    VenueRealtimeRecord {
        tour_id: record.tour_id.clone(),
        capacity,
        energy,
    }
}

fn jitter_headcount(current_attendance: u32, rng: &mut impl Rng) -> u32 {
    (f64::from(current_attendance) * rng.gen_range(ATTENDEE_JITTER_MIN..ATTENDEE_JITTER_MAX))
        .floor() as u32
}
