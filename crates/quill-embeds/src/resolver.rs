//! Embed resolution services and the renderer hook.

use std::sync::Arc;
use std::time::Duration;

use quill_cache::{BucketPolicy, Cache, MemoryCache};
use quill_renderer::html::{invalid_provider_card, render_local_target, render_provider};
use quill_renderer::{
    EmbedProcessor, EmbedRequest, EmbedTarget, EmbedType, ProcessResult, Replacements,
    placeholder,
};
use rayon::prelude::*;

use crate::bluesky::{BlueskyPostRef, HandleResolver, OEmbedClient};
use crate::card::metadata_card;
use crate::consts::{
    DEFAULT_DID_CAPACITY, DEFAULT_HANDLE_RESOLVERS, DEFAULT_IMAGE_PROXY_PATH,
    DEFAULT_MAX_BODY_BYTES, DEFAULT_METADATA_CAPACITY, DEFAULT_METADATA_TTL,
    DEFAULT_OEMBED_ENDPOINT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, DID_BUCKET, DID_TTL,
    METADATA_BUCKET,
};
use crate::fetch::{Fetcher, UreqFetcher};
use crate::image_proxy::ImageProxy;
use crate::metadata::MetadataResolver;
use crate::session::EmbedState;

/// Settings for [`EmbedServices`].
#[derive(Clone, Debug)]
pub struct ResolverSettings {
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: u64,
    pub metadata_ttl: Duration,
    pub metadata_cache_capacity: u64,
    pub did_cache_capacity: u64,
    pub handle_resolvers: Vec<String>,
    pub oembed_endpoint: String,
    /// Path prefix card images are routed through.
    pub image_proxy_path: String,
    /// Characters of a URL shown as a link card title.
    pub link_title_max: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            metadata_ttl: DEFAULT_METADATA_TTL,
            metadata_cache_capacity: DEFAULT_METADATA_CAPACITY,
            did_cache_capacity: DEFAULT_DID_CAPACITY,
            handle_resolvers: DEFAULT_HANDLE_RESOLVERS.map(str::to_owned).to_vec(),
            oembed_endpoint: DEFAULT_OEMBED_ENDPOINT.to_owned(),
            image_proxy_path: DEFAULT_IMAGE_PROXY_PATH.to_owned(),
            link_title_max: 60,
        }
    }
}

impl ResolverSettings {
    /// In-memory cache with the metadata and DID bucket policies applied.
    #[must_use]
    pub fn memory_cache(&self) -> MemoryCache {
        MemoryCache::default()
            .with_bucket(
                METADATA_BUCKET,
                BucketPolicy::bounded(self.metadata_cache_capacity).with_ttl(self.metadata_ttl),
            )
            .with_bucket(
                DID_BUCKET,
                BucketPolicy::bounded(self.did_cache_capacity).with_ttl(DID_TTL),
            )
    }
}

/// Shared upstream clients. Cheap to share behind an `Arc`.
pub struct EmbedServices {
    metadata: MetadataResolver,
    handles: HandleResolver,
    oembed: OEmbedClient,
    images: ImageProxy,
    image_proxy_path: String,
    link_title_max: usize,
}

impl EmbedServices {
    /// Build services over `fetcher`, caching in buckets of `cache`.
    pub fn new(settings: &ResolverSettings, fetcher: Arc<dyn Fetcher>, cache: &dyn Cache) -> Self {
        Self {
            metadata: MetadataResolver::new(Arc::clone(&fetcher), cache.bucket(METADATA_BUCKET)),
            handles: HandleResolver::new(Arc::clone(&fetcher), cache.bucket(DID_BUCKET))
                .with_endpoints(settings.handle_resolvers.clone()),
            oembed: OEmbedClient::new(Arc::clone(&fetcher))
                .with_endpoint(settings.oembed_endpoint.clone()),
            images: ImageProxy::new(fetcher),
            image_proxy_path: settings.image_proxy_path.clone(),
            link_title_max: settings.link_title_max,
        }
    }

    /// Production services: a `ureq` fetcher and bounded in-memory caches.
    #[must_use]
    pub fn from_settings(settings: &ResolverSettings) -> Self {
        let fetcher = UreqFetcher::new(settings.fetch_timeout)
            .user_agent(settings.user_agent.clone())
            .max_body(settings.max_body_bytes);
        Self::new(settings, Arc::new(fetcher), &settings.memory_cache())
    }

    pub fn metadata(&self) -> &MetadataResolver {
        &self.metadata
    }

    pub fn handles(&self) -> &HandleResolver {
        &self.handles
    }

    pub fn oembed(&self) -> &OEmbedClient {
        &self.oembed
    }

    pub fn images(&self) -> &ImageProxy {
        &self.images
    }

    /// Resolve one embed target to its final HTML.
    ///
    /// Never fails: unresolvable embeds become [`EmbedState::Failed`]
    /// carrying the fallback card.
    pub fn resolve_one(&self, target: &EmbedTarget) -> EmbedState {
        match target {
            EmbedTarget::Bluesky { url, post } => {
                match self.handles.resolve_handle_to_did(&post.handle) {
                    Some(did) => {
                        let post = BlueskyPostRef {
                            did,
                            rkey: post.rkey.clone(),
                        };
                        EmbedState::Resolved {
                            html: render_provider(
                                EmbedType::Bluesky,
                                url,
                                &post.at_uri(),
                                self.link_title_max,
                            ),
                        }
                    }
                    None => EmbedState::Failed {
                        html: invalid_provider_card(EmbedType::Bluesky, url),
                    },
                }
            }
            EmbedTarget::Card { url } => {
                let metadata = self.metadata.fetch_metadata(url);
                let html = metadata_card(url, &metadata, &self.image_proxy_path);
                if metadata.error {
                    EmbedState::Failed { html }
                } else {
                    EmbedState::Resolved { html }
                }
            }
            local => EmbedState::Resolved {
                html: render_local_target(local, self.link_title_max),
            },
        }
    }

    /// Resolve many embeds in parallel, preserving order.
    pub fn resolve_all(&self, requests: &[EmbedRequest]) -> Vec<(usize, EmbedState)> {
        requests
            .par_iter()
            .map(|request| (request.index, self.resolve_one(&request.target)))
            .collect()
    }
}

/// [`EmbedProcessor`] resolving remote embeds during rendering.
///
/// Emits placeholders while blocks are written, then resolves every
/// collected embed in parallel in [`post_process`](EmbedProcessor::post_process).
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use quill_embeds::{EmbedResolver, EmbedServices, ResolverSettings};
/// use quill_renderer::{ContentRenderer, Format};
///
/// let services = Arc::new(EmbedServices::from_settings(&ResolverSettings::default()));
/// let mut renderer = ContentRenderer::new().with_processor(EmbedResolver::new(services));
/// let result = renderer.render("{{card:https://example.com}}", Format::Markdown);
/// ```
pub struct EmbedResolver {
    services: Arc<EmbedServices>,
    extracted: Vec<EmbedRequest>,
    warnings: Vec<String>,
}

impl EmbedResolver {
    pub fn new(services: Arc<EmbedServices>) -> Self {
        Self {
            services,
            extracted: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl EmbedProcessor for EmbedResolver {
    fn process(&mut self, request: &EmbedRequest) -> ProcessResult {
        if !request.target.is_remote() {
            return ProcessResult::PassThrough;
        }
        self.extracted.push(request.clone());
        ProcessResult::Placeholder(placeholder(request.index))
    }

    fn post_process(&mut self, html: &mut String) {
        if self.extracted.is_empty() {
            return;
        }

        let requests = std::mem::take(&mut self.extracted);
        let resolved = self.services.resolve_all(&requests);

        let mut replacements = Replacements::with_capacity(resolved.len());
        for ((index, state), request) in resolved.into_iter().zip(&requests) {
            let html = match state {
                EmbedState::Resolved { html } => html,
                EmbedState::Failed { html } => {
                    self.warnings.push(format!(
                        "embed {index}: could not resolve {}",
                        request.target.url()
                    ));
                    html
                }
                EmbedState::Loading => continue,
            };
            replacements.add(placeholder(index), html);
        }
        replacements.apply(html);
    }

    fn warnings(&self) -> &[String] {
        &self.warnings
    }
}
