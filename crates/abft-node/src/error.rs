//! Maps [`abft_core::ConsensusError`] onto the HTTP status codes spec.md
//! §6 specifies, the way `guts-web::error` turns storage errors into JSON
//! responses with the right status code.

use abft_core::ConsensusError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError(pub ConsensusError);

impl From<ConsensusError> for ApiError {
    fn from(err: ConsensusError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            ConsensusError::MalformedMessage(_) => (
                StatusCode::BAD_REQUEST,
                "Invalid message format".to_string(),
            ),
            ConsensusError::StartWhileFaulty | ConsensusError::StartWhileKilled => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
        };
        (status, Json(json!({ "error": body }))).into_response()
    }
}
