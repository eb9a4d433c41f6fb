//! Link preview metadata.

use std::sync::Arc;

use quill_cache::{CacheBucket, CacheBucketExt};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::EmbedError;
use crate::fetch::Fetcher;
use crate::guard::is_private_host;
use crate::scrape::{PageHead, absolutize};

/// Preview data for a URL.
///
/// Serialized in camelCase; `error` is only present on fallbacks.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub url: String,
    pub favicon: Option<String>,
    pub domain: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

impl Metadata {
    /// Minimal metadata used when a page cannot be fetched.
    #[must_use]
    pub fn fallback(url: &str) -> Self {
        let host = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_owned))
            .unwrap_or_else(|| url.to_owned());
        Self {
            title: Some(host.clone()),
            description: Some(format!("Visit {host}")),
            image: None,
            site_name: Some(host.clone()),
            url: url.to_owned(),
            favicon: None,
            domain: host,
            error: true,
        }
    }

    /// Title to display: the page title, else the domain.
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.domain)
    }

    /// Build metadata from a fetched page.
    fn from_page(page: &Url, requested: &str, html: &str) -> Self {
        let head = PageHead::parse(html);
        let origin_icon = format!("{}/favicon.ico", page.origin().ascii_serialization());

        Self {
            title: head.meta("og:title").or_else(|| head.title()),
            description: head
                .meta("og:description")
                .or_else(|| head.meta("description")),
            image: head
                .meta("og:image")
                .and_then(|image| absolutize(page, &image)),
            site_name: head.meta("og:site_name"),
            url: head.meta("og:url").unwrap_or_else(|| requested.to_owned()),
            favicon: head
                .icon()
                .and_then(|icon| absolutize(page, &icon))
                .or(Some(origin_icon)),
            domain: page.host_str().unwrap_or_default().to_owned(),
            error: false,
        }
    }
}

/// Cache key for a URL: parsed, re-serialized, fragment removed.
fn cache_key(url: &Url) -> String {
    let mut key = url.clone();
    key.set_fragment(None);
    key.into()
}

/// Parse an absolute HTTP(S) URL on a public host.
pub(crate) fn parse_http_url(input: &str) -> Result<Url, EmbedError> {
    let url = Url::parse(input.trim()).map_err(|_| EmbedError::InvalidUrl(input.to_owned()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(EmbedError::InvalidUrl(input.to_owned()));
    }
    if is_private_host(&url) {
        return Err(EmbedError::PrivateHost(input.to_owned()));
    }
    Ok(url)
}

/// Fetches and caches [`Metadata`] for link cards.
pub struct MetadataResolver {
    fetcher: Arc<dyn Fetcher>,
    cache: Box<dyn CacheBucket>,
}

impl MetadataResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Box<dyn CacheBucket>) -> Self {
        Self { fetcher, cache }
    }

    /// Metadata for `url`. Never fails.
    ///
    /// Any failure yields [`Metadata::fallback`]. Only successful scrapes
    /// are cached.
    pub fn fetch_metadata(&self, url: &str) -> Metadata {
        match self.try_fetch(url) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(url, error = %e, "Metadata fetch failed, using fallback");
                Metadata::fallback(url)
            }
        }
    }

    fn try_fetch(&self, url: &str) -> Result<Metadata, EmbedError> {
        let page = parse_http_url(url)?;
        let key = cache_key(&page);

        if let Some(cached) = self.cache.get_json::<Metadata>(&key) {
            tracing::debug!(url, "Metadata cache hit");
            return Ok(cached);
        }

        let response = self
            .fetcher
            .get_prefix(page.as_str(), Some("text/html,application/xhtml+xml"))?
            .error_for_status()?;
        let metadata = Metadata::from_page(&page, url, &response.text());

        self.cache.set_json(&key, &metadata);
        Ok(metadata)
    }
}
