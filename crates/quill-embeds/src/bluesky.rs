//! Bluesky handle resolution and oEmbed.

use std::sync::Arc;

use quill_cache::{CacheBucket, CacheBucketExt};
use quill_renderer::parse_bluesky_url;
use serde::Deserialize;

use crate::card::encode_component;
use crate::consts::{DEFAULT_HANDLE_RESOLVERS, DEFAULT_OEMBED_ENDPOINT};
use crate::error::EmbedError;
use crate::fetch::Fetcher;

/// A Bluesky post addressed by DID.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlueskyPostRef {
    pub did: String,
    pub rkey: String,
}

impl BlueskyPostRef {
    /// `at://{did}/app.bsky.feed.post/{rkey}`
    #[must_use]
    pub fn at_uri(&self) -> String {
        format!("at://{}/app.bsky.feed.post/{}", self.did, self.rkey)
    }
}

#[derive(Deserialize)]
struct ResolveHandleResponse {
    did: Option<String>,
}

/// Resolves Bluesky handles to DIDs.
///
/// Endpoints are tried in order; the first one answering with a DID wins.
/// Resolved DIDs are cached by handle. Failures are not cached.
pub struct HandleResolver {
    fetcher: Arc<dyn Fetcher>,
    endpoints: Vec<String>,
    cache: Box<dyn CacheBucket>,
}

impl HandleResolver {
    pub fn new(fetcher: Arc<dyn Fetcher>, cache: Box<dyn CacheBucket>) -> Self {
        Self {
            fetcher,
            endpoints: DEFAULT_HANDLE_RESOLVERS.map(str::to_owned).to_vec(),
            cache,
        }
    }

    /// Replace the resolution endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Resolve `handle` (with or without a leading `@`) to a DID.
    pub fn resolve_handle_to_did(&self, handle: &str) -> Option<String> {
        let handle = handle.strip_prefix('@').unwrap_or(handle);
        if handle.is_empty() {
            return None;
        }

        if let Some(did) = self.cache.get_string(handle) {
            tracing::debug!(handle, "DID cache hit");
            return Some(did);
        }

        for endpoint in &self.endpoints {
            let url = format!("{endpoint}?handle={}", encode_component(handle));
            match self.query(&url) {
                Ok(Some(did)) => {
                    self.cache.set_string(handle, &did);
                    return Some(did);
                }
                Ok(None) => {
                    tracing::debug!(handle, endpoint = %endpoint, "Resolver returned no DID");
                }
                Err(e) => {
                    tracing::warn!(handle, endpoint = %endpoint, error = %e, "Handle resolution failed");
                }
            }
        }

        tracing::warn!(handle, "Could not resolve handle via any endpoint");
        None
    }

    fn query(&self, url: &str) -> Result<Option<String>, EmbedError> {
        let response = self
            .fetcher
            .get(url, Some("application/json"))?
            .error_for_status()?;
        let parsed: ResolveHandleResponse = serde_json::from_slice(&response.body)?;
        Ok(parsed.did.filter(|did| !did.is_empty()))
    }

    /// Turn a `bsky.app` post URL into a DID-addressed reference.
    ///
    /// Returns `None` when the URL is not a post URL or the handle does not
    /// resolve.
    pub fn parse_bluesky_url_to_params(&self, url: &str) -> Option<BlueskyPostRef> {
        let parts = parse_bluesky_url(url)?;
        let did = self.resolve_handle_to_did(&parts.handle)?;
        Some(BlueskyPostRef {
            did,
            rkey: parts.rkey,
        })
    }
}

/// Client for the Bluesky oEmbed endpoint.
pub struct OEmbedClient {
    fetcher: Arc<dyn Fetcher>,
    endpoint: String,
}

impl OEmbedClient {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            endpoint: DEFAULT_OEMBED_ENDPOINT.to_owned(),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Fetch the oEmbed document for a post URL, returned unchanged.
    pub fn fetch(&self, post_url: &str) -> Result<serde_json::Value, EmbedError> {
        let url = format!(
            "{}?url={}&format=json",
            self.endpoint,
            encode_component(post_url)
        );
        let response = self
            .fetcher
            .get(&url, Some("application/json"))?
            .error_for_status()?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use quill_cache::{Cache, MemoryCache, NullCache};
    use serde_json::json;

    use super::*;
    use crate::fetch::MockFetcher;

    const PUBLIC: &str =
        "https://public.api.bsky.app/xrpc/com.atproto.identity.resolveHandle?handle=alice.test";
    const SOCIAL: &str =
        "https://bsky.social/xrpc/com.atproto.identity.resolveHandle?handle=alice.test";

    fn handles(fetcher: &Arc<MockFetcher>, cache: &dyn Cache) -> HandleResolver {
        let fetcher: Arc<dyn Fetcher> = Arc::<MockFetcher>::clone(fetcher);
        HandleResolver::new(fetcher, cache.bucket("did"))
    }

    #[test]
    fn test_at_uri() {
        let post = BlueskyPostRef {
            did: "did:plc:abc".to_owned(),
            rkey: "3k2".to_owned(),
        };
        assert_eq!(post.at_uri(), "at://did:plc:abc/app.bsky.feed.post/3k2");
    }

    #[test]
    fn test_first_endpoint_wins() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_json(PUBLIC, &json!({"did": "did:plc:first"}))
                .with_json(SOCIAL, &json!({"did": "did:plc:second"})),
        );
        let did = handles(&fetcher, &NullCache).resolve_handle_to_did("@alice.test");
        assert_eq!(did.as_deref(), Some("did:plc:first"));
        assert_eq!(fetcher.requests(), vec![PUBLIC]);
    }

    #[test]
    fn test_falls_back_to_next_endpoint() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_status(PUBLIC, 502)
                .with_json(SOCIAL, &json!({"did": "did:plc:second"})),
        );
        let did = handles(&fetcher, &NullCache).resolve_handle_to_did("alice.test");
        assert_eq!(did.as_deref(), Some("did:plc:second"));
        assert_eq!(fetcher.requests(), vec![PUBLIC, SOCIAL]);
    }

    #[test]
    fn test_missing_did_and_total_failure() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_json(PUBLIC, &json!({"error": "InvalidRequest"}))
                .with_timeout(SOCIAL),
        );
        assert_eq!(
            handles(&fetcher, &NullCache).resolve_handle_to_did("alice.test"),
            None
        );
    }

    #[test]
    fn test_cached_without_at_sign() {
        let fetcher =
            Arc::new(MockFetcher::new().with_json(PUBLIC, &json!({"did": "did:plc:abc"})));
        let cache = MemoryCache::default();
        let resolver = handles(&fetcher, &cache);

        assert_eq!(
            resolver.resolve_handle_to_did("alice.test").as_deref(),
            Some("did:plc:abc")
        );
        assert_eq!(
            resolver.resolve_handle_to_did("@alice.test").as_deref(),
            Some("did:plc:abc")
        );
        assert_eq!(fetcher.request_count(PUBLIC), 1);
    }

    #[test]
    fn test_parse_url_to_params() {
        let fetcher =
            Arc::new(MockFetcher::new().with_json(PUBLIC, &json!({"did": "did:plc:abc"})));
        let resolver = handles(&fetcher, &NullCache);

        assert_eq!(
            resolver.parse_bluesky_url_to_params("https://bsky.app/profile/alice.test/post/3k2"),
            Some(BlueskyPostRef {
                did: "did:plc:abc".to_owned(),
                rkey: "3k2".to_owned(),
            })
        );
        assert_eq!(
            resolver.parse_bluesky_url_to_params("https://bsky.app/profile/alice.test"),
            None
        );
    }

    #[test]
    fn test_oembed_passthrough() {
        let post = "https://bsky.app/profile/alice.test/post/3k2";
        let endpoint = "https://embed.bsky.app/oembed?url=https%3A%2F%2Fbsky.app%2Fprofile%2Falice.test%2Fpost%2F3k2&format=json";
        let body = json!({"type": "rich", "html": "<blockquote></blockquote>", "version": "1.0"});
        let fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher::new().with_json(endpoint, &body));

        assert_eq!(OEmbedClient::new(fetcher).fetch(post).unwrap(), body);
    }

    #[test]
    fn test_oembed_failure() {
        let fetcher: Arc<dyn Fetcher> = Arc::new(MockFetcher::new());
        assert!(matches!(
            OEmbedClient::new(fetcher).fetch("https://bsky.app/profile/a/post/b"),
            Err(EmbedError::Timeout)
        ));
    }
}
