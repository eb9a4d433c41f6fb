//! HTML fragments for embeds.
//!
//! Provider rendering is a lookup table from [`EmbedType`] to a pure render
//! function plus the labels used by that provider's error card. All values
//! interpolated into markup are escaped here.

use crate::embed::{EmbedTarget, EmbedType};
use crate::escape::{escape_html, truncate_chars};

/// Renders a provider embed from its source URL and provider ID.
///
/// The ID is the video ID for YouTube, the tweet ID for Twitter and the
/// `at://` URI for Bluesky.
type RenderFn = fn(url: &str, id: &str) -> String;

struct Provider {
    kind: EmbedType,
    invalid_title: &'static str,
    view_label: &'static str,
    render: RenderFn,
}

static PROVIDERS: [Provider; 3] = [
    Provider {
        kind: EmbedType::YouTube,
        invalid_title: "Invalid YouTube URL",
        view_label: "View original video",
        render: youtube_html,
    },
    Provider {
        kind: EmbedType::Twitter,
        invalid_title: "Invalid Twitter/X URL",
        view_label: "View original tweet",
        render: tweet_html,
    },
    Provider {
        kind: EmbedType::Bluesky,
        invalid_title: "Invalid Bluesky URL or could not resolve handle",
        view_label: "View original post",
        render: bluesky_html,
    },
];

fn provider(kind: EmbedType) -> Option<&'static Provider> {
    PROVIDERS.iter().find(|p| p.kind == kind)
}

/// Render a provider embed. `Unknown` renders a generic link card.
#[must_use]
pub fn render_provider(kind: EmbedType, url: &str, id: &str, link_title_max: usize) -> String {
    match provider(kind) {
        Some(p) => (p.render)(url, id),
        None => link_card(url, link_title_max),
    }
}

/// Provider-specific "invalid URL" card with a link to the raw URL.
#[must_use]
pub fn invalid_provider_card(kind: EmbedType, url: &str) -> String {
    match provider(kind) {
        Some(p) => error_card(p.invalid_title, None, Some((p.view_label, url))),
        None => invalid_url_card(),
    }
}

/// Card for a URL that failed to parse.
#[must_use]
pub fn invalid_url_card() -> String {
    error_card(
        "Invalid URL format",
        Some("Please provide a valid URL."),
        None,
    )
}

/// Render a target that needs no remote data.
///
/// Remote targets (Bluesky posts, cards) render as their link card here;
/// callers wanting live resolution go through an `EmbedProcessor` instead.
#[must_use]
pub fn render_local_target(target: &EmbedTarget, link_title_max: usize) -> String {
    match target {
        EmbedTarget::YouTube { url, video_id } => {
            render_provider(EmbedType::YouTube, url, video_id, link_title_max)
        }
        EmbedTarget::Tweet { url, tweet_id } => {
            render_provider(EmbedType::Twitter, url, tweet_id, link_title_max)
        }
        EmbedTarget::Bluesky { url, .. }
        | EmbedTarget::Card { url }
        | EmbedTarget::Link { url }
        | EmbedTarget::Unsupported { url, .. } => link_card(url, link_title_max),
        EmbedTarget::InvalidUrl { .. } => invalid_url_card(),
        EmbedTarget::InvalidProvider { kind, url } => invalid_provider_card(*kind, url),
    }
}

/// Placeholder shown while a remote embed is being resolved.
///
/// Carries enough data attributes for a client to resolve it on its own.
#[must_use]
pub fn loading_placeholder(index: usize, target: &EmbedTarget) -> String {
    let (kind, label) = match target {
        EmbedTarget::Bluesky { .. } => ("bluesky", "Loading Bluesky post..."),
        _ => ("card", "Loading preview..."),
    };
    format!(
        r#"<div class="embed embed-loading" data-embed-id="{index}" data-embed-kind="{kind}" data-embed-url="{url}"><p>{label}</p></div>"#,
        url = escape_html(target.url()),
    )
}

/// Generic external link card; the title is the truncated URL.
#[must_use]
pub fn link_card(url: &str, link_title_max: usize) -> String {
    format!(
        concat!(
            r#"<div class="embed embed-link"><a class="embed-card" href="{href}" target="_blank" rel="noopener noreferrer">"#,
            r#"<span class="embed-card-label">External Link</span>"#,
            r#"<span class="embed-card-title">{title}</span>"#,
            r#"<span class="embed-card-meta">Click to view content</span>"#,
            r#"<span class="embed-card-action">Open Link</span></a></div>"#,
        ),
        href = escape_html(url),
        title = escape_html(&truncate_chars(url, link_title_max)),
    )
}

/// Error card with an optional message and an optional `(label, url)` link.
#[must_use]
pub fn error_card(title: &str, message: Option<&str>, link: Option<(&str, &str)>) -> String {
    let mut html = format!(
        r#"<div class="embed embed-error" role="note"><p class="embed-error-title">{}</p>"#,
        escape_html(title)
    );
    if let Some(message) = message {
        html.push_str(&format!(
            r#"<p class="embed-error-message">{}</p>"#,
            escape_html(message)
        ));
    }
    if let Some((label, url)) = link {
        html.push_str(&external_anchor(url, "embed-error-link", label));
    }
    html.push_str("</div>");
    html
}

fn external_anchor(url: &str, class: &str, label: &str) -> String {
    format!(
        r#"<a class="{class}" href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        escape_html(url),
        escape_html(label)
    )
}

fn youtube_html(_url: &str, video_id: &str) -> String {
    format!(
        concat!(
            r#"<div class="embed embed-youtube"><iframe src="https://www.youtube.com/embed/{id}" "#,
            r#"title="YouTube video player" frameborder="0" "#,
            r#"allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" "#,
            r#"allowfullscreen loading="lazy"></iframe></div>"#,
        ),
        id = escape_html(video_id),
    )
}

fn tweet_html(url: &str, tweet_id: &str) -> String {
    format!(
        concat!(
            r#"<div class="embed embed-twitter"><div class="embed-card">"#,
            r#"<p class="embed-card-title">X (Twitter) Post</p>"#,
            r#"<p class="embed-card-meta">Tweet ID: {id}</p>{link}</div></div>"#,
        ),
        id = escape_html(tweet_id),
        link = external_anchor(url, "embed-card-action", "Open on X"),
    )
}

fn bluesky_html(url: &str, at_uri: &str) -> String {
    format!(
        concat!(
            r#"<div class="embed embed-bluesky"><blockquote class="bluesky-embed" "#,
            r#"data-bluesky-uri="{uri}" data-bluesky-embed-color-mode="system">"#,
            r#"<p lang="en">{link}</p></blockquote></div>"#,
        ),
        uri = escape_html(at_uri),
        link = external_anchor(url, "bluesky-embed-link", "View this post on Bluesky"),
    )
}
