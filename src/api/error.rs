use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};

use crate::InsightsError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// How a handler failure reaches the client
#[derive(Debug)]
pub enum ApiError {
    /// Left to the framework: a bare 500 with no body
    Propagated(InsightsError),
    /// A 500 carrying `{"error": message}`
    Payload(InsightsError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Propagated(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            ApiError::Payload(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
