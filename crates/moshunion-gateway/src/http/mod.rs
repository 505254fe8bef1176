pub mod events;
pub mod health;
pub mod tours;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use moshunion_core::MoshError;
use moshunion_protocol::frames::ErrorShape;
use moshunion_venue::VenueError;

/// HTTP face of [`MoshError`]: a status code plus the wire error shape.
#[derive(Debug)]
pub struct ApiError(pub MoshError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            MoshError::InvalidInput(_) | MoshError::Protocol(_) | MoshError::Serialization(_) => {
                StatusCode::BAD_REQUEST
            }
            MoshError::TourNotFound { .. } => StatusCode::NOT_FOUND,
            MoshError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            MoshError::Busy(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MoshError> for ApiError {
    fn from(e: MoshError) -> Self {
        ApiError(e)
    }
}

impl From<VenueError> for ApiError {
    fn from(e: VenueError) -> Self {
        ApiError(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorShape {
            code: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
