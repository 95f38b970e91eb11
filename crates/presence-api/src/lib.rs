pub mod error;
pub mod middleware;
pub mod samples;
pub mod state;
pub mod status_page;

use axum::{Router, middleware as axum_middleware, routing::get};

pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// All routes, with state applied. Transport layers (tracing, CORS) are the
/// caller's business.
pub fn router(state: AppState) -> Router {
    let ingest_routes = Router::new()
        .route(
            "/putsample/{apikey}",
            get(samples::put_sample).post(samples::ingest_sample),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    Router::new()
        .route("/", get(status_page::home))
        .route("/health", get(status_page::health))
        .route("/samples/{id}", get(samples::get_sample))
        .merge(ingest_routes)
        .with_state(state)
}
