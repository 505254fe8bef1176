use thiserror::Error;

#[derive(Debug, Error)]
pub enum MoshError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tour not found: {id}")]
    TourNotFound { id: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// Transient; the client may retry.
    #[error("Busy: {0}")]
    Busy(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MoshError {
    /// Short error code string sent to clients in `error` frames and HTTP bodies.
    pub fn code(&self) -> &'static str {
        match self {
            MoshError::Config(_) => "CONFIG_ERROR",
            MoshError::Protocol(_) => "PROTOCOL_ERROR",
            MoshError::InvalidInput(_) => "INVALID_INPUT",
            MoshError::TourNotFound { .. } => "TOUR_NOT_FOUND",
            MoshError::Serialization(_) => "SERIALIZATION_ERROR",
            MoshError::Io(_) => "IO_ERROR",
            MoshError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            MoshError::Busy(_) => "BUSY",
            MoshError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

pub type Result<T> = std::result::Result<T, MoshError>;
