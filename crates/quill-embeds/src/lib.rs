//! Remote embed resolution for Quill.
//!
//! The renderer crate never touches the network. Everything that needs an
//! upstream lives here:
//!
//! - [`MetadataResolver`]: scrapes Open Graph metadata for link cards
//! - [`HandleResolver`]: resolves Bluesky handles to DIDs
//! - [`OEmbedClient`]: proxies the Bluesky oEmbed endpoint
//! - [`ImageProxy`]: fetches card images on the page's behalf
//! - [`EmbedResolver`]: `EmbedProcessor` that resolves a document's remote
//!   embeds in parallel after rendering
//! - [`EmbedTracker`]: per-client preview sessions that drop stale results
//!
//! All HTTP goes through the [`Fetcher`] trait. Enable the `mock` feature for
//! `MockFetcher` in downstream tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use quill_cache::NullCache;
//! use quill_embeds::{EmbedError, EmbedServices, FetchResponse, Fetcher, ResolverSettings};
//! use quill_renderer::EmbedTarget;
//!
//! struct StaticPage;
//!
//! impl Fetcher for StaticPage {
//!     fn get(&self, _url: &str, _accept: Option<&str>) -> Result<FetchResponse, EmbedError> {
//!         Ok(FetchResponse {
//!             status: 200,
//!             content_type: Some("text/html".to_owned()),
//!             body: b"<title>Example</title>".to_vec(),
//!         })
//!     }
//! }
//!
//! let services = EmbedServices::new(&ResolverSettings::default(), Arc::new(StaticPage), &NullCache);
//!
//! let state = services.resolve_one(&EmbedTarget::Card {
//!     url: "https://example.com/".to_owned(),
//! });
//! assert!(state.html().unwrap().contains("Example"));
//! ```

mod bluesky;
mod card;
mod consts;
mod error;
mod fetch;
mod guard;
mod image_proxy;
mod metadata;
mod resolver;
mod scrape;
mod session;

pub use bluesky::{BlueskyPostRef, HandleResolver, OEmbedClient};
pub use card::metadata_card;
pub use consts::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use error::EmbedError;
#[cfg(any(test, feature = "mock"))]
pub use fetch::MockFetcher;
pub use fetch::{FetchResponse, Fetcher, UreqFetcher};
pub use guard::is_private_host;
pub use image_proxy::{ImageProxy, ProxiedImage};
pub use metadata::{Metadata, MetadataResolver};
pub use resolver::{EmbedResolver, EmbedServices, ResolverSettings};
pub use session::{EmbedSnapshot, EmbedState, EmbedTracker, SessionToken};
