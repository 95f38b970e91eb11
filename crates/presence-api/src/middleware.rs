use axum::{
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

/// Reject requests whose `{apikey}` path segment doesn't match the configured key.
pub async fn require_api_key(
    State(state): State<AppState>,
    Path(apikey): Path<String>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if apikey != state.api_key {
        // The key is part of the path, so the path itself is not logged.
        warn!("Rejected {} request: bad API key", req.method());
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}
