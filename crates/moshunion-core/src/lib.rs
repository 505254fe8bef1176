//! `moshunion-core`: shared data model, identifiers, configuration and the
//! top-level error type for the venue realtime state service.

pub mod config;
pub mod error;
pub mod types;
pub mod venue;

pub use error::{MoshError, Result};
pub use types::{ConnId, TourId};
