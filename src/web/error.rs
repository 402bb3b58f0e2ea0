use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::engine::EngineError;

/// Engine failures rendered as `{"error", "kind"}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::InvalidConfig { .. } | EngineError::MalformedBar { .. } => {
                StatusCode::BAD_REQUEST
            }
            EngineError::DataLoad { missing: true, .. } => StatusCode::NOT_FOUND,
            EngineError::DataLoad { .. } => StatusCode::BAD_REQUEST,
            EngineError::InvalidState { .. } => StatusCode::CONFLICT,
            EngineError::InsufficientData { .. } | EngineError::InsufficientWarmup { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::Worker { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lifecycle::EngineState;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::InvalidConfig { errors: vec![] }, StatusCode::BAD_REQUEST),
            (
                EngineError::InvalidState {
                    operation: "train",
                    state: EngineState::Initialized,
                },
                StatusCode::CONFLICT,
            ),
            (EngineError::source_missing("a.csv", "gone"), StatusCode::NOT_FOUND),
            (EngineError::data_load("a.csv", "bad row"), StatusCode::BAD_REQUEST),
            (
                EngineError::InsufficientData { bars: 2, required: 4 },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }
}
