//! Image proxy endpoint.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;

use crate::error::ServerError;
use crate::handlers::UrlQuery;
use crate::state::AppState;

/// Handle GET /api/image-proxy?url=.
///
/// Streams back the upstream bytes with the upstream content type. Anything
/// that is not a successful `image/*` response is a 500.
pub(crate) async fn get_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UrlQuery>,
) -> Result<impl IntoResponse, ServerError> {
    let url = query.require_public_url()?;

    let services = Arc::clone(&state.services);
    let image = tokio::task::spawn_blocking(move || services.images().fetch_image(&url))
        .await?
        .map_err(ServerError::Image)?;

    Ok((
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, "public, max-age=86400".to_owned()),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".to_owned()),
        ],
        image.bytes,
    ))
}
