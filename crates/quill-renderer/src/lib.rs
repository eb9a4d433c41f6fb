//! Markdown and embed content renderer for Quill.
//!
//! Turns stored post content into HTML. Markdown content runs through a
//! fixed pipeline:
//!
//! ```text
//! raw ──► normalize ──► parse_blocks ──► per block:
//!                                          ├─► format_inline (text blocks)
//!                                          └─► route_embed / route_card
//!                                                 ├─► local embed HTML
//!                                                 └─► EmbedProcessor (remote data)
//! ```
//!
//! - [`EmbedNormalizer`] rewrites `{type:url}`, `{{card:url}}` and bare
//!   provider URLs into canonical `[type]url[/type]` syntax.
//! - [`parse_blocks`] classifies lines into [`Block`]s.
//! - [`format_inline`] escapes text and applies inline markup.
//! - [`route_embed`] maps a directive to an [`EmbedTarget`].
//! - [`ContentRenderer`] composes the above for a declared [`Format`].
//!
//! Network access lives outside this crate: remote embeds are delegated to
//! [`EmbedProcessor`] implementations (see the `quill-embeds` crate).
//!
//! # Example
//!
//! ```
//! use quill_renderer::{ContentRenderer, Format};
//!
//! let mut renderer = ContentRenderer::new();
//! let result = renderer.render("Watch:\nhttps://youtu.be/dQw4w9WgXcQ", Format::Markdown);
//!
//! assert!(result.html.contains("youtube.com/embed/dQw4w9WgXcQ"));
//! ```

mod block;
mod embed;
mod escape;
mod fence;
pub mod html;
mod inline;
mod normalize;
mod processor;
mod renderer;
mod replacements;

pub use block::{Block, parse_blocks};
pub use embed::{
    BlueskyUrlParts, EmbedTarget, EmbedType, ProviderHint, detect_embed_type, extract_clean_url,
    extract_tweet_id, extract_youtube_id, is_valid_url, parse_bluesky_url, route_card,
    route_embed,
};
pub use escape::{escape_html, truncate_chars};
pub use inline::format_inline;
pub use normalize::{EmbedNormalizer, normalize};
pub use processor::{EmbedProcessor, EmbedRequest, ProcessResult, placeholder};
pub use renderer::{ContentRenderer, Format, PendingEmbed, RenderOptions, RenderResult, UnknownFormat};
pub use replacements::Replacements;
