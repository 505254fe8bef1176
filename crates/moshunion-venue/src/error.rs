use thiserror::Error;

/// Errors raised by the venue generator and store.
#[derive(Debug, Error)]
pub enum VenueError {
    /// Input that slipped past the catalog boundary (e.g. an unparsable show date).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No record is tracked for the given tour id.
    #[error("Tour not found: {id}")]
    TourNotFound { id: String },
}

impl From<VenueError> for moshunion_core::MoshError {
    fn from(e: VenueError) -> Self {
        match e {
            VenueError::InvalidInput(msg) => moshunion_core::MoshError::InvalidInput(msg),
            VenueError::TourNotFound { id } => moshunion_core::MoshError::TourNotFound { id },
        }
    }
}

pub type Result<T> = std::result::Result<T, VenueError>;
