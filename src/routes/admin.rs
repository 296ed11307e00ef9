//! Administrative alert endpoints: manual authoring, the aggregated
//! reporting view, and the global delete-by-message operation.
//!
//! Role enforcement (admin vs. user) is an external collaborator; these
//! routes assume the caller has already been authorized as an administrator.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::inbox::AlertAggregate;
use crate::models::{AlertEvent, AlertType, Severity};
use crate::pipeline;
use crate::state::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    // One path, three methods.
    Router::new().route(
        "/admin/alerts",
        post(create_alert).get(list_alerts).delete(delete_alert),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAlertRequest {
    alert_type: AlertType,
    message: String,
    #[serde(default)]
    severity: Option<Severity>,
    /// Omitted means broadcast to all users and all connections.
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAlertResponse {
    alert: AlertEvent,
    recipients: usize,
}

async fn create_alert(
    State(state): State<AppState>,
    Json(req): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<CreateAlertResponse>)> {
    // ---
    let (alert, recipients) = pipeline::create_manual_alert(
        &state,
        req.alert_type,
        req.severity,
        req.message,
        req.city,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateAlertResponse { alert, recipients }),
    ))
}

async fn list_alerts(State(state): State<AppState>) -> Json<Vec<AlertAggregate>> {
    // ---
    Json(state.inbox.aggregate_by_message().await)
}

#[derive(Debug, Deserialize)]
struct DeleteAlertRequest {
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteAlertResponse {
    affected_users: usize,
}

async fn delete_alert(
    State(state): State<AppState>,
    Json(req): Json<DeleteAlertRequest>,
) -> Json<DeleteAlertResponse> {
    // ---
    let affected_users = state.inbox.delete_by_message(&req.message).await;
    Json(DeleteAlertResponse { affected_users })
}
