//! Configuration management for Quill.
//!
//! Parses `quill.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `embeds.user_agent`
//! - `embeds.handle_resolvers`
//! - `embeds.oembed_endpoint`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the outbound fetch timeout.
    pub fetch_timeout_secs: Option<u64>,
    /// Override bare-link preview cards.
    pub preview_bare_links: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "quill.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Embed resolution configuration.
    pub embeds: EmbedsConfig,
    /// Content rendering configuration.
    pub render: RenderConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

/// Outbound fetching and caching for embeds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EmbedsConfig {
    /// Timeout for every outbound request, in seconds.
    pub fetch_timeout_secs: u64,
    /// `User-Agent` sent when scraping pages.
    pub user_agent: String,
    /// How long successful metadata lookups stay cached, in seconds.
    pub metadata_ttl_secs: u64,
    /// Maximum number of cached metadata entries.
    pub metadata_cache_capacity: u64,
    /// Maximum number of cached handle to DID mappings.
    pub did_cache_capacity: u64,
    /// Bluesky `resolveHandle` endpoints, tried in order.
    pub handle_resolvers: Vec<String>,
    /// Bluesky oEmbed endpoint.
    pub oembed_endpoint: String,
    /// Largest response body read from upstream, in bytes.
    pub max_body_bytes: u64,
    /// Same-origin path serving proxied images.
    pub image_proxy_path: String,
}

impl Default for EmbedsConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            user_agent: "Mozilla/5.0 (compatible; Blog-Card-Bot/1.0)".to_owned(),
            metadata_ttl_secs: 3600,
            metadata_cache_capacity: 1024,
            did_cache_capacity: 4096,
            handle_resolvers: vec![
                "https://public.api.bsky.app/xrpc/com.atproto.identity.resolveHandle".to_owned(),
                "https://bsky.social/xrpc/com.atproto.identity.resolveHandle".to_owned(),
            ],
            oembed_endpoint: "https://embed.bsky.app/oembed".to_owned(),
            max_body_bytes: 2 * 1024 * 1024,
            image_proxy_path: "/api/image-proxy".to_owned(),
        }
    }
}

impl EmbedsConfig {
    /// Outbound request timeout.
    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Metadata cache time-to-live.
    #[must_use]
    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.metadata_ttl_secs)
    }
}

/// Content rendering configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// CSS class of the content container.
    pub prose_class: String,
    /// Render bare unknown links as metadata cards instead of plain links.
    pub preview_bare_links: bool,
    /// Characters of a URL shown as a generic link card title.
    pub link_title_max: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            prose_class: "prose".to_owned(),
            preview_bare_links: false,
            link_title_max: 60,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`embeds.user_agent`").
        field: String,
        /// Error message (e.g., "${`BOT_AGENT`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn require_positive(value: u64, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `quill.toml` in current directory and parents,
    /// falling back to defaults when none is found.
    ///
    /// CLI settings are applied last and the result is validated again, so a
    /// bad override is reported the same way as a bad file value.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(timeout) = settings.fetch_timeout_secs {
            self.embeds.fetch_timeout_secs = timeout;
        }
        if let Some(preview) = settings.preview_bare_links {
            self.render.preview_bare_links = preview;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_embeds()?;
        self.validate_render()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_embeds(&self) -> Result<(), ConfigError> {
        let embeds = &self.embeds;
        require_positive(embeds.fetch_timeout_secs, "embeds.fetch_timeout_secs")?;
        require_positive(embeds.metadata_ttl_secs, "embeds.metadata_ttl_secs")?;
        require_positive(embeds.metadata_cache_capacity, "embeds.metadata_cache_capacity")?;
        require_positive(embeds.did_cache_capacity, "embeds.did_cache_capacity")?;
        require_positive(embeds.max_body_bytes, "embeds.max_body_bytes")?;
        require_non_empty(&embeds.user_agent, "embeds.user_agent")?;

        if embeds.handle_resolvers.is_empty() {
            return Err(ConfigError::Validation(
                "embeds.handle_resolvers needs at least one endpoint".to_owned(),
            ));
        }
        for resolver in &embeds.handle_resolvers {
            require_http_url(resolver, "embeds.handle_resolvers")?;
        }
        require_http_url(&embeds.oembed_endpoint, "embeds.oembed_endpoint")?;

        if !embeds.image_proxy_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "embeds.image_proxy_path must start with /".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_render(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.render.prose_class, "render.prose_class")?;
        if self.render.link_title_max == 0 {
            return Err(ConfigError::Validation(
                "render.link_title_max must be greater than 0".to_owned(),
            ));
        }
        Ok(())
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.embeds.user_agent = expand::expand_env(&self.embeds.user_agent, "embeds.user_agent")?;
        self.embeds.handle_resolvers =
            expand::expand_env_list(&self.embeds.handle_resolvers, "embeds.handle_resolvers")?;
        self.embeds.oembed_endpoint =
            expand::expand_env(&self.embeds.oembed_endpoint, "embeds.oembed_endpoint")?;
        Ok(())
    }
}
