//! HTTP server for the Quill content pipeline.
//!
//! This crate provides a native Rust HTTP server using axum, serving:
//! - Link metadata, Bluesky oEmbed and image proxy endpoints for embeds
//! - A render endpoint returning fully resolved HTML
//! - Live preview endpoints that resolve embeds in the background
//!
//! # Quick Start
//!
//! ```ignore
//! use quill_server::{ServerConfig, run_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig {
//!         port: 3000,
//!         version: "1.0.0".to_owned(),
//!         ..ServerConfig::default()
//!     };
//!
//!     run_server(config).await.unwrap();
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! Browser ──HTTP──► axum router (quill-server)
//!                        │
//!                        ├─► /api/render, /api/preview
//!                        │       │
//!                        │       └─► ContentRenderer ──► EmbedResolver (rayon)
//!                        │
//!                        └─► /api/metadata, /api/bluesky-oembed, /api/image-proxy
//!                                │
//!                                └─► EmbedServices ──► ureq (spawn_blocking)
//! ```

mod app;
mod error;
mod handlers;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use quill_embeds::{EmbedServices, EmbedTracker, ResolverSettings};
use quill_renderer::RenderOptions;
use state::AppState;

pub use error::ServerError;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Upstream clients and cache sizing.
    pub resolver: ResolverSettings,
    /// Options applied to every render.
    pub render: RenderOptions,
    /// Log render warnings.
    pub verbose: bool,
    /// Application version (reported by `/health`).
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
            resolver: ResolverSettings::default(),
            render: RenderOptions::default(),
            verbose: false,
            version: String::new(),
        }
    }
}

/// Run the server.
///
/// # Arguments
///
/// * `config` - Server configuration
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = Arc::new(EmbedServices::from_settings(&config.resolver));

    let state = Arc::new(AppState {
        services,
        tracker: Arc::new(EmbedTracker::default()),
        render_options: config.render.clone(),
        verbose: config.verbose,
        version: config.version.clone(),
    });

    let app = app::create_router(state);

    let addr = SocketAddr::from_str(&format!("{}:{}", config.host, config.port))?;
    tracing::info!(address = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}

/// Create server configuration from Quill config.
///
/// # Arguments
///
/// * `config` - Loaded configuration
/// * `version` - Application version
/// * `verbose` - Log render warnings
#[must_use]
pub fn server_config_from_config(
    config: &quill_config::Config,
    version: String,
    verbose: bool,
) -> ServerConfig {
    ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        resolver: resolver_settings(config),
        render: render_options(config),
        verbose,
        version,
    }
}

/// Resolver settings from the `[embeds]` and `[render]` sections.
#[must_use]
pub fn resolver_settings(config: &quill_config::Config) -> ResolverSettings {
    let embeds = &config.embeds;
    ResolverSettings {
        fetch_timeout: embeds.fetch_timeout(),
        user_agent: embeds.user_agent.clone(),
        max_body_bytes: embeds.max_body_bytes,
        metadata_ttl: embeds.metadata_ttl(),
        metadata_cache_capacity: embeds.metadata_cache_capacity,
        did_cache_capacity: embeds.did_cache_capacity,
        handle_resolvers: embeds.handle_resolvers.clone(),
        oembed_endpoint: embeds.oembed_endpoint.clone(),
        image_proxy_path: embeds.image_proxy_path.clone(),
        link_title_max: config.render.link_title_max,
    }
}

/// Render options from the `[render]` section.
#[must_use]
pub fn render_options(config: &quill_config::Config) -> RenderOptions {
    RenderOptions {
        prose_class: config.render.prose_class.clone(),
        preview_bare_links: config.render.preview_bare_links,
        link_title_max: config.render.link_title_max,
    }
}
