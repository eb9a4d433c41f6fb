//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use quill_embeds::EmbedError;
use quill_renderer::UnknownFormat;
use serde_json::json;

/// Server error type.
///
/// Upstream failures keep their cause for logging; the response body only
/// carries a fixed message.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Required `url` query parameter is absent or empty.
    #[error("Missing url parameter")]
    MissingUrl,

    /// `url` query parameter is not an absolute HTTP(S) URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// `url` targets a loopback, private or link-local host.
    #[error("URL host not allowed: {0}")]
    ForbiddenHost(String),

    /// Content format is not one of markdown, html or plain.
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormat),

    /// Bluesky oEmbed request failed.
    #[error("oEmbed request failed")]
    OEmbed(#[source] EmbedError),

    /// Image proxy request failed.
    #[error("Image proxy request failed")]
    Image(#[source] EmbedError),

    /// Preview token no longer current for the client.
    #[error("Preview session superseded")]
    PreviewSuperseded,

    /// Blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::MissingUrl => (StatusCode::BAD_REQUEST, "Missing url parameter".to_owned()),
            Self::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "Invalid URL".to_owned()),
            Self::ForbiddenHost(url) => {
                tracing::warn!(url = %url, "Refused private host");
                (StatusCode::FORBIDDEN, "URL host not allowed".to_owned())
            }
            Self::UnknownFormat(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            Self::OEmbed(e) => {
                tracing::warn!(error = %e, "Bluesky oEmbed failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch oEmbed data".to_owned(),
                )
            }
            Self::Image(e) => {
                tracing::warn!(error = %e, "Image proxy failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load image".to_owned(),
                )
            }
            Self::PreviewSuperseded => (
                StatusCode::CONFLICT,
                "Preview session superseded".to_owned(),
            ),
            Self::Task(e) => {
                tracing::error!(error = %e, "Blocking task failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
