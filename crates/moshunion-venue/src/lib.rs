//! `moshunion-venue`: simulated venue capacity and crowd energy.
//!
//! # Overview
//!
//! [`tables`] holds the static band-popularity / venue-prestige data,
//! [`generator`] turns a tour's parameters into a fresh snapshot or nudges an
//! existing one, and [`store::VenueStore`] keeps the latest record per tour id
//! with TTL and LRU eviction.
//!
//! All randomness flows through an injected `Rng`; each tour owns its own
//! generator (see [`seed`]) so deterministic mode is reproducible per tour.

pub mod error;
pub mod generator;
pub mod seed;
pub mod store;
pub mod tables;

pub use error::{Result, VenueError};
pub use store::VenueStore;
