//! Link metadata endpoint.
//!
//! Scrapes Open Graph metadata for link preview cards. Upstream failures
//! still answer 200 with fallback metadata (`error: true`).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::ServerError;
use crate::handlers::UrlQuery;
use crate::state::AppState;

/// Handle GET /api/metadata?url=.
pub(crate) async fn get_metadata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let url = query.require_public_url()?;

    let services = Arc::clone(&state.services);
    let metadata =
        tokio::task::spawn_blocking(move || services.metadata().fetch_metadata(&url)).await?;

    let cache_control = if metadata.error {
        "no-store"
    } else {
        "public, max-age=3600"
    };
    Ok((
        [
            (header::CACHE_CONTROL, cache_control),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(metadata),
    ))
}
