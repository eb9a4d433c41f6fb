//! Error type for upstream requests.

/// Error from an outbound fetch.
///
/// Callers on the rendering path never surface these; they are logged and
/// turned into fallbacks. Only the server's proxy endpoints map them to
/// HTTP errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// Request failed before a response arrived (DNS, TLS, connection reset).
    #[error("HTTP request failed")]
    Http(#[source] ureq::Error),

    /// Request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Upstream answered with a non-success status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// Response was expected to be an image.
    #[error("not an image (content type: {0})")]
    NotImage(String),

    /// Response body was not the expected JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Input could not be parsed as an absolute HTTP(S) URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// URL targets a loopback, private or link-local host.
    #[error("refusing to fetch private host: {0}")]
    PrivateHost(String),
}

impl From<ureq::Error> for EmbedError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Timeout(_) => Self::Timeout,
            other => Self::Http(other),
        }
    }
}
