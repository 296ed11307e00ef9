//! User-facing endpoints: registration, inbox reads, read-state updates,
//! and personal threshold configuration.
//!
//! Authentication is an external collaborator; handlers trust the user id in
//! the path and only require that it names a registered profile.

use axum::{
    extract::Path, extract::State, http::StatusCode, response::IntoResponse, routing::get,
    routing::post, routing::put, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::inbox::{InboxEntry, UserProfile};
use crate::models::ThresholdConfig;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new()
        .route("/users", post(register))
        .route("/users/{id}/alerts", get(list_alerts))
        .route("/users/{id}/alerts/read-all", post(mark_all_read))
        .route("/users/{id}/alerts/{entry_id}/read", post(mark_read))
        .route("/users/{id}/thresholds", put(set_thresholds))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    user_id: String,
    city: String,
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    // ---
    let profile = state.inbox.register_user(&req.user_id, &req.city).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn list_alerts(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<InboxEntry>>> {
    // ---
    Ok(Json(state.inbox.list_for_user(&user_id).await?))
}

async fn mark_read(
    State(state): State<AppState>,
    Path((user_id, entry_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    // ---
    state.inbox.mark_read(&user_id, entry_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
struct MarkAllResponse {
    marked: usize,
}

async fn mark_all_read(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MarkAllResponse>> {
    // ---
    let marked = state.inbox.mark_all_read(&user_id).await?;
    Ok(Json(MarkAllResponse { marked }))
}

async fn set_thresholds(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(thresholds): Json<ThresholdConfig>,
) -> Result<impl IntoResponse> {
    // ---
    state.inbox.set_thresholds(&user_id, thresholds).await?;
    Ok(StatusCode::NO_CONTENT)
}
