//! Error taxonomy for the `citypulse` core pipeline.
//!
//! Three caller-visible error classes, each with a fixed HTTP mapping:
//! - [`CoreError::Validation`] – malformed input, 400
//! - [`CoreError::NotFound`] – missing city/entry, 404
//! - [`CoreError::StoreUnavailable`] – reading-store failure, 503
//!
//! A dropped per-subscriber delivery is deliberately *not* represented here:
//! fan-out failures are logged inside the distribution fabric and never
//! propagate to the publishing caller.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use thiserror::Error;

// ---

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input: empty city, out-of-range coordinates, non-finite
    /// numeric fields, unknown duration keys, empty alert fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested city has no readings, or the inbox entry does not
    /// belong to the requesting user.
    #[error("not found: {0}")]
    NotFound(String),

    /// The reading store could not complete the operation. The detail string
    /// is logged but never sent to the client.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Convenience `Result` type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ---

/// JSON error body returned by all endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoreError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CoreError::StoreUnavailable(detail) => {
                // Internal storage details stay out of the response body.
                tracing::error!("store unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage temporarily unavailable, try again".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn display_includes_detail() {
        // ---
        let err = CoreError::Validation("city must not be empty".into());
        assert_eq!(err.to_string(), "validation error: city must not be empty");

        let err = CoreError::NotFound("no readings for 'Atlantis'".into());
        assert!(err.to_string().contains("Atlantis"));
    }
}
