use crate::api::AppState;
use crate::error::Result;
use axum::{extract::State, http::header, response::IntoResponse};
use tracing::error;

pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse> {
    // Pool occupancy is read from the pool itself, no database round trip
    state.metrics.record_pool(state.pool.stats());

    let body = state.metrics.render().map_err(|e| {
        error!("Failed to render metrics: {}", e);
        e
    })?;

    Ok(([(header::CONTENT_TYPE, state.metrics.content_type())], body))
}
