//! Content renderer: the composition root of the pipeline.

use std::fmt;
use std::str::FromStr;

use crate::block::{Block, parse_blocks};
use crate::embed::{EmbedTarget, route_card, route_embed};
use crate::escape::escape_html;
use crate::html::{loading_placeholder, render_local_target};
use crate::inline::format_inline;
use crate::normalize::normalize;
use crate::processor::{EmbedProcessor, EmbedRequest, ProcessResult};

/// Declared format of stored content. Never inferred from the content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Format {
    #[default]
    Markdown,
    Html,
    Plain,
}

impl Format {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown format name.
#[derive(Debug, thiserror::Error)]
#[error("Unknown content format: {0} (expected markdown, html or plain)")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "plain" | "text" => Ok(Self::Plain),
            _ => Err(UnknownFormat(s.to_owned())),
        }
    }
}

/// Explicit rendering configuration.
#[derive(Clone, Debug)]
pub struct RenderOptions {
    /// CSS class of the content container.
    pub prose_class: String,
    /// Render bare unknown links as metadata cards.
    pub preview_bare_links: bool,
    /// Characters of a URL shown as a link card title.
    pub link_title_max: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            prose_class: "prose".to_owned(),
            preview_bare_links: false,
            link_title_max: 60,
        }
    }
}

/// A remote embed found during rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PendingEmbed {
    /// Matches `data-embed-id` on the loading placeholder.
    pub id: usize,
    /// `"bluesky"` or `"card"`.
    pub kind: &'static str,
    pub url: String,
    #[cfg_attr(feature = "serde", serde(skip))]
    pub target: EmbedTarget,
}

/// Result of rendering content.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RenderResult {
    pub html: String,
    /// Parsed blocks (markdown only).
    pub blocks: Vec<Block>,
    /// Remote embeds, in document order.
    pub embeds: Vec<PendingEmbed>,
    pub warnings: Vec<String>,
}

/// Renders stored content to HTML.
///
/// Markdown runs through the normalizer and block parser; each block is
/// rendered on its own so one bad embed never affects the rest. Remote
/// embeds go to registered [`EmbedProcessor`]s; when none handles them the
/// renderer emits a loading placeholder.
///
/// # Example
///
/// ```
/// use quill_renderer::{ContentRenderer, Format};
///
/// let result = ContentRenderer::new().render("# Hi\n\n**bold**", Format::Markdown);
/// assert_eq!(
///     result.html,
///     "<div class=\"prose\"><h1>Hi</h1>\n<p><strong>bold</strong></p>\n</div>"
/// );
/// ```
#[derive(Default)]
pub struct ContentRenderer {
    options: RenderOptions,
    processors: Vec<Box<dyn EmbedProcessor>>,
}

impl ContentRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Register an embed processor. Processors are asked in order.
    #[must_use]
    pub fn with_processor<P: EmbedProcessor + 'static>(mut self, processor: P) -> Self {
        self.processors.push(Box::new(processor));
        self
    }

    #[must_use]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Render `content` in the declared `format`.
    pub fn render(&mut self, content: &str, format: Format) -> RenderResult {
        match format {
            Format::Html => RenderResult {
                html: format!(
                    r#"<div class="{} prose-html">{content}</div>"#,
                    escape_html(&self.options.prose_class)
                ),
                blocks: Vec::new(),
                embeds: Vec::new(),
                warnings: Vec::new(),
            },
            Format::Plain => RenderResult {
                html: format!(
                    r#"<pre class="prose-plain">{}</pre>"#,
                    escape_html(content)
                ),
                blocks: Vec::new(),
                embeds: Vec::new(),
                warnings: Vec::new(),
            },
            Format::Markdown => self.render_markdown(content),
        }
    }

    fn render_markdown(&mut self, content: &str) -> RenderResult {
        let blocks = parse_blocks(&normalize(content));
        let mut writer = BlockWriter::new(&self.options, &mut self.processors);

        writer.write_all(&blocks);

        let BlockWriter {
            mut output,
            embeds,
            mut warnings,
            ..
        } = writer;
        for processor in &mut self.processors {
            processor.post_process(&mut output);
        }
        warnings.extend(self.processors.iter().flat_map(|p| p.warnings()).cloned());

        RenderResult {
            html: format!(
                r#"<div class="{}">{output}</div>"#,
                escape_html(&self.options.prose_class)
            ),
            blocks,
            embeds,
            warnings,
        }
    }
}

/// Writes blocks as HTML, grouping consecutive list items.
struct BlockWriter<'a> {
    options: &'a RenderOptions,
    processors: &'a mut [Box<dyn EmbedProcessor>],
    output: String,
    /// `Some(ordered)` while a list is open.
    open_list: Option<bool>,
    embeds: Vec<PendingEmbed>,
    warnings: Vec<String>,
}

impl<'a> BlockWriter<'a> {
    fn new(options: &'a RenderOptions, processors: &'a mut [Box<dyn EmbedProcessor>]) -> Self {
        Self {
            options,
            processors,
            output: String::with_capacity(4096),
            open_list: None,
            embeds: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn write_all(&mut self, blocks: &[Block]) {
        for block in blocks {
            self.write_block(block);
        }
        self.close_list();
    }

    fn write_block(&mut self, block: &Block) {
        if !matches!(block, Block::ListItem { .. }) {
            self.close_list();
        }

        match block {
            Block::ListItem { ordered, text } => {
                self.open_list(*ordered);
                self.line(&format!("<li>{}</li>", format_inline(text)));
            }
            Block::Heading { level, text } => {
                self.line(&format!("<h{level}>{}</h{level}>", format_inline(text)));
            }
            Block::Paragraph { text } => {
                self.line(&format!("<p>{}</p>", format_inline(text)));
            }
            Block::Blockquote { text } => {
                self.line(&format!(
                    "<blockquote><p>{}</p></blockquote>",
                    format_inline(text)
                ));
            }
            Block::CodeBlock { language, text } => {
                let class = language
                    .as_deref()
                    .map(|lang| format!(r#" class="language-{}""#, escape_html(lang)))
                    .unwrap_or_default();
                self.line(&format!(
                    "<pre><code{class}>{}</code></pre>",
                    escape_html(text)
                ));
            }
            Block::HorizontalRule => self.line("<hr>"),
            Block::Spacer => {}
            Block::Aside { children } => {
                self.output.push_str("<aside>\n");
                self.write_all(children);
                self.output.push_str("</aside>\n");
            }
            Block::EmbedDirective { hint, url } => {
                let target = route_embed(hint, url);
                if let EmbedTarget::Unsupported { name, .. } = &target {
                    self.warnings
                        .push(format!("Unsupported embed type '{name}', rendered as a link"));
                }
                self.write_target(target);
            }
            Block::CardDirective { url } => self.write_target(route_card(url)),
            Block::LinkCandidate { url } => {
                if self.options.preview_bare_links {
                    self.write_target(route_card(url));
                } else {
                    self.line(&format!(
                        r#"<p><a href="{href}" target="_blank" rel="noopener noreferrer">{href}</a></p>"#,
                        href = escape_html(url)
                    ));
                }
            }
        }
    }

    fn write_target(&mut self, target: EmbedTarget) {
        if !target.is_remote() {
            let html = render_local_target(&target, self.options.link_title_max);
            self.line(&html);
            return;
        }

        let request = EmbedRequest {
            index: self.embeds.len(),
            target,
        };
        let mut html = None;
        for processor in &mut *self.processors {
            match processor.process(&request) {
                ProcessResult::Placeholder(s) | ProcessResult::Inline(s) => {
                    html = Some(s);
                    break;
                }
                ProcessResult::PassThrough => {}
            }
        }
        let html = html.unwrap_or_else(|| loading_placeholder(request.index, &request.target));
        self.line(&html);

        self.embeds.push(PendingEmbed {
            id: request.index,
            kind: match request.target {
                EmbedTarget::Bluesky { .. } => "bluesky",
                _ => "card",
            },
            url: request.target.url().to_owned(),
            target: request.target,
        });
    }

    fn open_list(&mut self, ordered: bool) {
        if self.open_list == Some(ordered) {
            return;
        }
        self.close_list();
        self.output.push_str(if ordered { "<ol>\n" } else { "<ul>\n" });
        self.open_list = Some(ordered);
    }

    fn close_list(&mut self) {
        if let Some(ordered) = self.open_list.take() {
            self.output
                .push_str(if ordered { "</ol>\n" } else { "</ul>\n" });
        }
    }

    fn line(&mut self, html: &str) {
        self.output.push_str(html);
        self.output.push('\n');
    }
}
