use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use moshunion_core::{
    venue::{TourParams, VenueRealtimeRecord},
    MoshError, TourId,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use super::ApiError;
use crate::app::AppState;

/// Body of `POST /tours`: the tour id plus its catalog parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTour {
    pub tour_id: TourId,
    #[serde(flatten)]
    pub params: TourParams,
}

/// POST /tours: register (or re-register) a tour and return its record.
pub async fn create_tour(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTour>, JsonRejection>,
) -> Result<(StatusCode, Json<VenueRealtimeRecord>), ApiError> {
    let Json(req) = body.map_err(|e| MoshError::InvalidInput(e.body_text()))?;
    if req.tour_id.as_str().trim().is_empty() {
        return Err(MoshError::InvalidInput("tourId must not be empty".into()).into());
    }

    let record = state.store.create(&req.tour_id, &req.params)?;
    info!(tour_id = %req.tour_id, band = %req.params.band_name, venue = %req.params.venue, "tour registered");

    // viewers of a re-registered tour see the regenerated record right away
    if state.hub.viewer_count(&req.tour_id) > 0 {
        state
            .hub
            .publish(&req.tour_id, state.snapshot_frame(record.clone()));
    }
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /tours/{id}: current record; counts as a touch.
pub async fn get_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<VenueRealtimeRecord>, ApiError> {
    let record = state.store.get_or_create(&TourId::from(id), None)?;
    Ok(Json(record))
}

/// DELETE /tours/{id}: explicit eviction.
pub async fn delete_tour(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let tour_id = TourId::from(id);
    if state.store.evict(&tour_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(MoshError::TourNotFound {
            id: tour_id.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use tower::ServiceExt;

    use crate::app::{build_router, test_state};

    use super::*;

    async fn send(router: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header("content-type", "application/json");
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let res = router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), 1 << 20).await.unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn create_get_delete_lifecycle() {
        let (state, _shutdown) = test_state();
        let router = build_router(state);

        let body = r#"{"tourId":"msg-1","venue":"Madison Square Garden","bandName":"Metallica","showDate":"2031-05-01"}"#;
        let (status, created) = send(&router, Method::POST, "/tours", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["tourId"], "msg-1");
        assert_eq!(created["capacity"]["venueCapacity"], 20000);

        let (status, fetched) = send(&router, Method::GET, "/tours/msg-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, _) = send(&router, Method::DELETE, "/tours/msg-1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, err) = send(&router, Method::GET, "/tours/msg-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(err["code"], "TOUR_NOT_FOUND");

        let (status, _) = send(&router, Method::DELETE, "/tours/msg-1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn bad_show_date_is_invalid_input() {
        let (state, _shutdown) = test_state();
        let router = build_router(state.clone());

        let body = r#"{"tourId":"x","venue":"The Roxy","bandName":"Slayer","showDate":"next friday"}"#;
        let (status, err) = send(&router, Method::POST, "/tours", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "INVALID_INPUT");
        assert!(state.store.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_input() {
        let (state, _shutdown) = test_state();
        let router = build_router(state);
        let (status, err) = send(&router, Method::POST, "/tours", Some(r#"{"venue":1}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(err["code"], "INVALID_INPUT");
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let (state, _shutdown) = test_state();
        let router = build_router(state);
        let (status, health) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "ok");
        assert_eq!(health["tours"], 0);
        assert_eq!(health["ws_clients"], 0);
    }
}
