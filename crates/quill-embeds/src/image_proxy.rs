//! Image passthrough for preview cards.

use std::sync::Arc;

use crate::error::EmbedError;
use crate::fetch::Fetcher;
use crate::metadata::parse_http_url;

/// A fetched image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxiedImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Fetches remote images on behalf of the page.
pub struct ImageProxy {
    fetcher: Arc<dyn Fetcher>,
}

impl ImageProxy {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Fetch `url`, requiring a 2xx response with an `image/*` content type.
    pub fn fetch_image(&self, url: &str) -> Result<ProxiedImage, EmbedError> {
        let url = parse_http_url(url)?;
        let response = self
            .fetcher
            .get(url.as_str(), Some("image/*"))?
            .error_for_status()?;

        match response.content_type {
            Some(content_type) if content_type.trim().to_ascii_lowercase().starts_with("image/") => {
                Ok(ProxiedImage {
                    content_type,
                    bytes: response.body,
                })
            }
            other => Err(EmbedError::NotImage(other.unwrap_or_default())),
        }
    }
}
