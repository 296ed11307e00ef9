//! Reading ingestion and query endpoints.
//!
//! `POST /readings` runs the full pipeline for one reading: validate, store,
//! evaluate, deliver to inboxes, publish to subscribers. The GET endpoints
//! map one-to-one onto the reading store's query contract.

use axum::{
    extract::Path, extract::Query, extract::State, http::StatusCode, response::IntoResponse,
    routing::get, routing::post, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CoreError, Result};
use crate::models::{SensorReading, StoredReading};
use crate::pipeline;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/readings", post(ingest))
        .route("/readings/latest/{city}", get(latest))
        .route("/readings/nearby", get(nearby))
        .route("/readings/history/{city}", get(history))
}

async fn ingest(
    State(state): State<AppState>,
    Json(reading): Json<SensorReading>,
) -> Result<impl IntoResponse> {
    // ---
    info!("POST /readings - city '{}'", reading.city);
    let report = pipeline::ingest(&state, reading).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

async fn latest(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<StoredReading>> {
    // ---
    let stored = state.store.latest(&city).await?;
    Ok(Json((*stored).clone()))
}

/// Query parameters for `GET /readings/nearby`.
#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: f64,
    lon: f64,
    radius_m: f64,
}

async fn nearby(
    State(state): State<AppState>,
    Query(params): Query<NearbyQuery>,
) -> Result<Json<Vec<StoredReading>>> {
    // ---
    if !(-90.0..=90.0).contains(&params.lat) || !(-180.0..=180.0).contains(&params.lon) {
        return Err(CoreError::Validation(
            "lat/lon outside WGS84 bounds".into(),
        ));
    }
    if !params.radius_m.is_finite() || params.radius_m < 0.0 {
        return Err(CoreError::Validation(
            "radius_m must be a non-negative number".into(),
        ));
    }

    let hits = state
        .store
        .nearby(params.lat, params.lon, params.radius_m)
        .await;
    Ok(Json(hits.iter().map(|r| (**r).clone()).collect()))
}

/// Query parameters for `GET /readings/history/{city}`.
#[derive(Debug, Deserialize)]
struct HistoryQuery {
    /// Dotted field path, e.g. `airQuality.aqi`.
    parameter: String,
    /// Duration key: `24h`, `7d`, or `30d`.
    since: String,
}

/// One point of a historical series.
#[derive(Debug, Serialize)]
struct HistoryPoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

async fn history(
    State(state): State<AppState>,
    Path(city): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<Vec<HistoryPoint>>> {
    // ---
    let series = state
        .store
        .historical(&city, &params.parameter, &params.since)
        .await?;
    Ok(Json(
        series
            .into_iter()
            .map(|(timestamp, value)| HistoryPoint { timestamp, value })
            .collect(),
    ))
}
