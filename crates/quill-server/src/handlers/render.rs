//! Render endpoint.
//!
//! Renders stored content with every remote embed resolved server-side.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use quill_embeds::EmbedResolver;
use quill_renderer::{Block, ContentRenderer, Format};
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::state::AppState;

/// Body of POST /api/render.
#[derive(Deserialize)]
pub(crate) struct RenderRequest {
    content: String,
    /// Declared format; defaults to markdown.
    #[serde(default)]
    format: Option<String>,
}

/// Response for POST /api/render.
#[derive(Serialize)]
pub(crate) struct RenderResponse {
    html: String,
    blocks: Vec<Block>,
    warnings: Vec<String>,
}

/// Parse an optional declared format.
pub(crate) fn parse_format(format: Option<&str>) -> Result<Format, ServerError> {
    Ok(format.map(str::parse::<Format>).transpose()?.unwrap_or_default())
}

/// Handle POST /api/render.
pub(crate) async fn render(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>, ServerError> {
    let format = parse_format(request.format.as_deref())?;

    let services = Arc::clone(&state.services);
    let options = state.render_options.clone();
    let result = tokio::task::spawn_blocking(move || {
        ContentRenderer::new()
            .with_options(options)
            .with_processor(EmbedResolver::new(services))
            .render(&request.content, format)
    })
    .await?;

    if state.verbose {
        for warning in &result.warnings {
            tracing::warn!(%warning, "Render warning");
        }
    }

    Ok(Json(RenderResponse {
        html: result.html,
        blocks: result.blocks,
        warnings: result.warnings,
    }))
}
