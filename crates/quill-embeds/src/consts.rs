//! Default settings for outbound requests and caches.

use std::time::Duration;

/// Default timeout for every outbound request (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User agent sent when scraping pages and fetching images.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; Blog-Card-Bot/1.0)";

/// Largest response body read from an upstream (2 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 2 * 1024 * 1024;

/// Lifetime of a cached metadata entry (1 hour).
pub const DEFAULT_METADATA_TTL: Duration = Duration::from_secs(3600);

pub const DEFAULT_METADATA_CAPACITY: u64 = 1024;

pub const DEFAULT_DID_CAPACITY: u64 = 4096;

/// Lifetime of a cached handle-to-DID mapping (24 hours).
pub const DID_TTL: Duration = Duration::from_secs(24 * 3600);

/// Handle resolution endpoints, tried in order.
pub const DEFAULT_HANDLE_RESOLVERS: [&str; 2] = [
    "https://public.api.bsky.app/xrpc/com.atproto.identity.resolveHandle",
    "https://bsky.social/xrpc/com.atproto.identity.resolveHandle",
];

pub const DEFAULT_OEMBED_ENDPOINT: &str = "https://embed.bsky.app/oembed";

pub const DEFAULT_IMAGE_PROXY_PATH: &str = "/api/image-proxy";

/// Cache bucket holding scraped page metadata.
pub const METADATA_BUCKET: &str = "metadata";

/// Cache bucket holding resolved Bluesky DIDs.
pub const DID_BUCKET: &str = "did";
