use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::error;

use presence_sampler::{SampleOutcome, store_sweep, take_sample};
use presence_types::api::{IngestRequest, PointResponse, PutSampleResponse, SampleResponse};

use crate::error::ApiError;
use crate::state::AppState;

fn created(outcome: SampleOutcome) -> impl IntoResponse {
    (
        StatusCode::CREATED,
        Json(PutSampleResponse {
            ts: outcome.taken,
            id: outcome.id,
            status: "ok".to_string(),
        }),
    )
}

/// GET /putsample/{apikey} — probe every configured target and store the sweep.
pub async fn put_sample(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let ts = Utc::now();

    let outcome = take_sample(state.db.clone(), &state.probe, &state.targets, ts)
        .await
        .map_err(ApiError::Storage)?;

    Ok(created(outcome))
}

/// POST /putsample/{apikey} — store a sweep computed by an external probe.
pub async fn ingest_sample(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let ts = Utc::now();
    let Json(req) = body.map_err(|e| ApiError::Invalid(e.body_text()))?;

    if !req.elapsed.is_finite() || req.elapsed < 0.0 {
        return Err(ApiError::Invalid(format!("bad elapsed: {}", req.elapsed)));
    }
    if let Some(obs) = req.observations.iter().find(|o| o.username.trim().is_empty()) {
        return Err(ApiError::Invalid(format!("empty username with status {}", obs.status)));
    }

    let outcome = store_sweep(state.db.clone(), ts, req.elapsed, req.observations)
        .await
        .map_err(ApiError::Storage)?;

    Ok(created(outcome))
}

/// GET /samples/{id} — one sample with its presence points.
pub async fn get_sample(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let (row, points) = tokio::task::spawn_blocking(move || -> anyhow::Result<_> {
        let Some(row) = db.get_sample(id)? else {
            return Ok((None, Vec::new()));
        };
        let points = db.get_presence_points(id)?;
        Ok((Some(row), points))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(e.into())
    })?
    .map_err(ApiError::Internal)?;

    let sample = row.ok_or(ApiError::NotFound)?.into_sample().map_err(ApiError::Internal)?;

    let points = points
        .into_iter()
        .map(|p| {
            let status = p.status().map_err(|e| {
                ApiError::Internal(e.context(format!(
                    "corrupt point (sample {}, user {})",
                    p.sample_id, p.user_id
                )))
            })?;
            Ok(PointResponse {
                user_id: p.user_id,
                username: p.username,
                status,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(SampleResponse {
        id: sample.id,
        taken: sample.taken,
        elapsed: sample.elapsed,
        status: sample.status,
        points,
    }))
}
