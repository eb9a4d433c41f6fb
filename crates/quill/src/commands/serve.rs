//! `quill serve` command implementation.

use std::path::PathBuf;

use clap::Args;
use quill_config::{CliSettings, Config};
use quill_server::{run_server, server_config_from_config};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// Path to configuration file (default: auto-discover quill.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind to (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Outbound request timeout in seconds (overrides config).
    #[arg(long)]
    fetch_timeout: Option<u64>,

    /// Render bare links as preview cards (overrides config).
    #[arg(long)]
    preview_links: bool,

    /// Enable verbose output (debug logs and render warnings).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) async fn execute(self, version: &str) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            host: self.host,
            port: self.port,
            fetch_timeout_secs: self.fetch_timeout,
            preview_bare_links: self.preview_links.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.highlight(&format!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        ));
        match &config.config_path {
            Some(path) => output.info(&format!("Config: {}", path.display())),
            None => output.info("Config: defaults (no quill.toml found)"),
        }
        output.info(&format!(
            "Fetch timeout: {}s, metadata cache: {} entries for {}s",
            config.embeds.fetch_timeout_secs,
            config.embeds.metadata_cache_capacity,
            config.embeds.metadata_ttl_secs
        ));
        if config.render.preview_bare_links {
            output.info("Bare links: preview cards");
        }

        let server_config = server_config_from_config(&config, version.to_owned(), self.verbose);
        run_server(server_config)
            .await
            .map_err(|e| CliError::Server(e.to_string()))?;

        Ok(())
    }
}
