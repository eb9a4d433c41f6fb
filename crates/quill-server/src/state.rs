//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use quill_embeds::{EmbedServices, EmbedTracker};
use quill_renderer::RenderOptions;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Upstream clients and caches.
    pub(crate) services: Arc<EmbedServices>,
    /// Live preview sessions.
    pub(crate) tracker: Arc<EmbedTracker>,
    /// Options for every render.
    pub(crate) render_options: RenderOptions,
    /// Include render warnings in server logs.
    pub(crate) verbose: bool,
    /// Application version reported by `/health`.
    pub(crate) version: String,
}
