//! Embed processor trait for deferred embed resolution.
//!
//! Embeds that need network data (Bluesky posts, metadata cards) are handed
//! to registered processors instead of being rendered directly. A processor
//! usually answers with a placeholder and swaps in the resolved HTML from
//! [`EmbedProcessor::post_process`] once rendering is done.
//!
//! # Example
//!
//! ```
//! use quill_renderer::{
//!     ContentRenderer, EmbedProcessor, EmbedRequest, EmbedTarget, Format, ProcessResult,
//! };
//!
//! struct CardsAsLinks;
//!
//! impl EmbedProcessor for CardsAsLinks {
//!     fn process(&mut self, request: &EmbedRequest) -> ProcessResult {
//!         match &request.target {
//!             EmbedTarget::Card { url } => ProcessResult::Inline(format!("<p>{url}</p>")),
//!             _ => ProcessResult::PassThrough,
//!         }
//!     }
//! }
//!
//! let mut renderer = ContentRenderer::new().with_processor(CardsAsLinks);
//! let result = renderer.render("{{card:https://example.com}}", Format::Markdown);
//! assert!(result.html.contains("<p>https://example.com</p>"));
//! ```

use crate::embed::EmbedTarget;

/// An embed waiting for remote data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmbedRequest {
    /// Zero-based index of this embed among the document's remote embeds.
    pub index: usize,
    pub target: EmbedTarget,
}

/// Result of processing an embed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Emit a placeholder now and replace it in `post_process`.
    Placeholder(String),
    /// Emit HTML immediately.
    Inline(String),
    /// Not handled; the renderer emits its loading placeholder.
    PassThrough,
}

/// Hook for resolving remote embeds.
pub trait EmbedProcessor {
    /// Process one remote embed.
    fn process(&mut self, request: &EmbedRequest) -> ProcessResult;

    /// Replace placeholders in the rendered HTML.
    ///
    /// Called once per render after every block has been written.
    fn post_process(&mut self, _html: &mut String) {}

    /// Warnings generated while processing.
    fn warnings(&self) -> &[String] {
        &[]
    }
}

/// Placeholder marker for the embed at `index`.
///
/// HTML comments cannot appear in rendered user text (`<` is always
/// escaped), so a placeholder can never be forged by content.
#[must_use]
pub fn placeholder(index: usize) -> String {
    format!("<!--quill-embed:{index}-->")
}
