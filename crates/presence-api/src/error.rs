use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use presence_types::api::ErrorResponse;

/// Errors surfaced at the HTTP boundary. Details are logged, never sent.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("storage failure: {0:#}")]
    Storage(anyhow::Error),
    #[error("internal error: {0:#}")]
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::Invalid(_) => {
                warn!("{}", self);
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::error())).into_response()
            }
            Self::Storage(_) => {
                error!("{}", self);
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::error())).into_response()
            }
            Self::Internal(_) => {
                error!("{}", self);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}
