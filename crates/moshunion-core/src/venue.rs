//! Venue realtime data model: shared by the metric generator, the store,
//! the broadcast hub and the wire protocol.
//!
//! Every derived field (`status`, `energy_status`) is recomputed through the
//! constructors in this module, never assigned directly, so it always agrees
//! with its numeric source.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::TourId;

/// Thresholds (inclusive lower bounds) for [`CapacityStatus`].
pub const FILLING_FAST_PCT: u8 = 70;
pub const NEARLY_FULL_PCT: u8 = 85;
pub const SOLD_OUT_PCT: u8 = 98;

/// Thresholds (inclusive lower bounds) for [`EnergyStatus`].
pub const MODERATE_ENERGY: f64 = 0.4;
pub const HIGH_ENERGY: f64 = 0.6;
pub const EXPLOSIVE_ENERGY: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityStatus {
    Available,
    FillingFast,
    NearlyFull,
    SoldOut,
}

impl CapacityStatus {
    pub fn from_percentage(pct: u8) -> Self {
        match pct {
            p if p >= SOLD_OUT_PCT => CapacityStatus::SoldOut,
            p if p >= NEARLY_FULL_PCT => CapacityStatus::NearlyFull,
            p if p >= FILLING_FAST_PCT => CapacityStatus::FillingFast,
            _ => CapacityStatus::Available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyStatus {
    Low,
    Moderate,
    High,
    Explosive,
}

impl EnergyStatus {
    pub fn from_level(level: f64) -> Self {
        if level >= EXPLOSIVE_ENERGY {
            EnergyStatus::Explosive
        } else if level >= HIGH_ENERGY {
            EnergyStatus::High
        } else if level >= MODERATE_ENERGY {
            EnergyStatus::Moderate
        } else {
            EnergyStatus::Low
        }
    }
}

/// Seats/standing capacity and the simulated attendance at one show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueCapacitySnapshot {
    pub venue_capacity: u32,
    pub current_attendance: u32,
    /// Independently jittered "live" headcount (≈95–105 % of attendance).
    pub attendee_count: u32,
    pub capacity_percentage: u8,
    pub status: CapacityStatus,
}

impl VenueCapacitySnapshot {
    /// Build a snapshot, clamping attendance to the venue size and deriving
    /// percentage and status.
    pub fn new(venue_capacity: u32, current_attendance: u32, attendee_count: u32) -> Self {
        let venue_capacity = venue_capacity.max(1);
        let current_attendance = current_attendance.min(venue_capacity);
        let capacity_percentage = capacity_percentage(current_attendance, venue_capacity);
        Self {
            venue_capacity,
            current_attendance,
            attendee_count,
            capacity_percentage,
            status: CapacityStatus::from_percentage(capacity_percentage),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.current_attendance <= self.venue_capacity
            && self.capacity_percentage
                == capacity_percentage(self.current_attendance, self.venue_capacity)
            && self.status == CapacityStatus::from_percentage(self.capacity_percentage)
    }
}

fn capacity_percentage(current: u32, capacity: u32) -> u8 {
    let pct = (f64::from(current) / f64::from(capacity.max(1)) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Component signals behind the crowd energy estimate, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyMetrics {
    pub social_buzz: f64,
    pub review_sentiment: f64,
    pub anticipation_score: f64,
    pub band_popularity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrowdEnergySnapshot {
    pub energy_level: f64,
    pub energy_status: EnergyStatus,
    pub metrics: EnergyMetrics,
    pub last_update: DateTime<Utc>,
}

impl CrowdEnergySnapshot {
    /// Clamp and round the level to its published form, then derive the status
    /// from the published value.
    pub fn new(energy_level: f64, metrics: EnergyMetrics, last_update: DateTime<Utc>) -> Self {
        let energy_level = round2(clamp01(energy_level));
        Self {
            energy_level,
            energy_status: EnergyStatus::from_level(energy_level),
            metrics,
            last_update,
        }
    }

    pub fn is_consistent(&self) -> bool {
        (0.0..=1.0).contains(&self.energy_level)
            && self.energy_status == EnergyStatus::from_level(self.energy_level)
    }
}

/// The full current state of one tour: also the push payload shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueRealtimeRecord {
    pub tour_id: TourId,
    pub capacity: VenueCapacitySnapshot,
    pub energy: CrowdEnergySnapshot,
}

impl VenueRealtimeRecord {
    pub fn is_consistent(&self) -> bool {
        self.capacity.is_consistent() && self.energy.is_consistent()
    }
}

/// Initialisation parameters supplied by the band/tour catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourParams {
    pub venue: String,
    pub band_name: String,
    /// RFC 3339 timestamp or a plain `YYYY-MM-DD` date (00:00 UTC).
    pub show_date: String,
}

impl TourParams {
    /// Parse `show_date`. Returns `None` for anything unparsable.
    pub fn parse_show_date(&self) -> Option<DateTime<Utc>> {
        let raw = self.show_date.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

pub fn clamp01(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// Round to two decimal places, the precision every published float uses.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
