//! `moshunion-scheduler`: the timers that keep venue records moving.
//!
//! # Overview
//!
//! Two independent loops, each driven by its own `tokio::time::interval` and
//! stopped by the same `watch` shutdown flag:
//!
//! | Loop                        | Period              | Work                                        |
//! |-----------------------------|---------------------|---------------------------------------------|
//! | [`engine::SchedulerEngine`] | `scheduler.tick_secs`  | perturb every watched tour, forward records |
//! | [`sweeper::Sweeper`]        | `scheduler.sweep_secs` | drop records idle past the store TTL        |
//!
//! The engine only learns which tours are watched through the
//! [`roster::TourRoster`] trait, so it never depends on a transport.

pub mod engine;
pub mod error;
pub mod roster;
pub mod sweeper;

pub use engine::{SchedulerEngine, TickReport};
pub use error::{Result, SchedulerError};
pub use roster::TourRoster;
pub use sweeper::Sweeper;
