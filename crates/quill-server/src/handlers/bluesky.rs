//! Bluesky oEmbed proxy endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::ServerError;
use crate::handlers::UrlQuery;
use crate::state::AppState;

/// Handle GET /api/bluesky-oembed?url=.
///
/// Returns the upstream oEmbed document unchanged.
pub(crate) async fn get_oembed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let url = query.require_url()?;

    let services = Arc::clone(&state.services);
    let document = tokio::task::spawn_blocking(move || services.oembed().fetch(&url))
        .await?
        .map_err(ServerError::OEmbed)?;

    Ok(([(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")], Json(document)))
}
