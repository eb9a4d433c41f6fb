//! Live preview endpoints.
//!
//! `POST /api/preview` renders immediately with loading placeholders and
//! resolves remote embeds in the background. The editor then polls
//! `GET /api/preview/{client}/embeds?token=` and swaps placeholders in as
//! embeds settle. A newer preview from the same client supersedes older
//! ones: their results are dropped and polling them answers 409.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use quill_embeds::{EmbedSnapshot, SessionToken};
use quill_renderer::ContentRenderer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::handlers::render::parse_format;
use crate::state::AppState;

/// Body of POST /api/preview.
#[derive(Deserialize)]
pub(crate) struct PreviewRequest {
    /// Opaque editor identifier; one live session per client.
    client: String,
    content: String,
    #[serde(default)]
    format: Option<String>,
}

/// Response for POST /api/preview and GET /api/preview/{client}/embeds.
#[derive(Serialize)]
pub(crate) struct PreviewResponse {
    token: SessionToken,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<String>,
    embeds: Vec<EmbedSnapshot>,
}

#[derive(Deserialize)]
pub(crate) struct TokenQuery {
    token: u64,
}

/// Handle POST /api/preview.
pub(crate) async fn start_preview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, ServerError> {
    let format = parse_format(request.format.as_deref())?;

    let result = ContentRenderer::new()
        .with_options(state.render_options.clone())
        .render(&request.content, format);

    let token = state
        .tracker
        .begin(&request.client, result.embeds.iter().map(|embed| embed.id));
    let embeds = state
        .tracker
        .snapshot(&request.client, token)
        .unwrap_or_default();

    if !result.embeds.is_empty() {
        let services = Arc::clone(&state.services);
        let tracker = Arc::clone(&state.tracker);
        let client = request.client;
        let pending = result.embeds;
        tokio::task::spawn_blocking(move || {
            pending.par_iter().for_each(|embed| {
                if !tracker.is_current(&client, token) {
                    return;
                }
                let outcome = services.resolve_one(&embed.target);
                tracker.complete(&client, token, embed.id, outcome);
            });
        });
    }

    Ok(Json(PreviewResponse {
        token,
        html: Some(result.html),
        embeds,
    }))
}

/// Handle GET /api/preview/{client}/embeds?token=.
pub(crate) async fn get_preview_embeds(
    State(state): State<Arc<AppState>>,
    Path(client): Path<String>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<PreviewResponse>, ServerError> {
    let token = SessionToken(query.token);
    let embeds = state
        .tracker
        .snapshot(&client, token)
        .ok_or(ServerError::PreviewSuperseded)?;

    Ok(Json(PreviewResponse {
        token,
        html: None,
        embeds,
    }))
}
