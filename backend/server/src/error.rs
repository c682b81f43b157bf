use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{placement::PlaceError, utils::FieldError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input")]
    InvalidInput(Vec<FieldError>),

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] JsonRejection),

    #[error("Cooldown active")]
    CooldownActive { retry_after: u64 },

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<PlaceError> for AppError {
    fn from(err: PlaceError) -> Self {
        match err {
            PlaceError::InvalidInput(errors) => AppError::InvalidInput(errors),
            PlaceError::CooldownActive(active) => AppError::CooldownActive {
                retry_after: active.retry_after,
            },
            PlaceError::Canvas(e) => AppError::InternalError(Box::new(e)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::InvalidInput(errors) => (StatusCode::BAD_REQUEST, json!({ "errors": errors })),
            AppError::MalformedPayload(rejection) => {
                (rejection.status(), json!({ "error": rejection.body_text() }))
            }
            AppError::CooldownActive { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({ "error": "Cooldown active", "retryAfter": retry_after }),
            ),
            AppError::InternalError(e) => {
                error!("Internal error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
