//! `quill render` command implementation.
//!
//! Renders one content file (or stdin) to HTML on stdout.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use quill_config::{CliSettings, Config};
use quill_embeds::{EmbedResolver, EmbedServices};
use quill_renderer::{ContentRenderer, Format, RenderResult};
use quill_server::{render_options, resolver_settings};

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Content file to render; `-` or omitted reads stdin.
    input: Option<PathBuf>,

    /// Declared content format: markdown, html or plain.
    #[arg(short, long, default_value = "markdown")]
    format: String,

    /// Path to configuration file (default: auto-discover quill.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not fetch remote embeds; leave loading placeholders.
    #[arg(long)]
    offline: bool,

    /// Print the full render result as JSON instead of HTML.
    #[arg(long)]
    json: bool,

    /// Render bare links as preview cards (overrides config).
    #[arg(long)]
    preview_links: bool,

    /// Enable verbose output (debug logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or input cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let format: Format = self.format.parse()?;

        let cli_settings = CliSettings {
            preview_bare_links: self.preview_links.then_some(true),
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let content = read_input(self.input.as_deref())?;
        tracing::debug!(
            config = ?config.config_path,
            format = format.as_str(),
            offline = self.offline,
            "Rendering content"
        );

        let mut renderer = ContentRenderer::new().with_options(render_options(&config));
        if !self.offline {
            let services = EmbedServices::from_settings(&resolver_settings(&config));
            renderer = renderer.with_processor(EmbedResolver::new(Arc::new(services)));
        }
        let result = renderer.render(&content, format);
        tracing::debug!(
            blocks = result.blocks.len(),
            embeds = result.embeds.len(),
            warnings = result.warnings.len(),
            "Rendered content"
        );

        for warning in &result.warnings {
            output.warning(&format!("Warning: {warning}"));
        }

        let mut stdout = std::io::stdout().lock();
        stdout.write_all(render_output(&result, self.json)?.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) if path != Path::new("-") => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

fn render_output(result: &RenderResult, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(result)?)
    } else {
        Ok(result.html.clone())
    }
}
