//! Link preview card markup.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use quill_renderer::escape_html;

use crate::metadata::Metadata;

/// Characters left alone by JavaScript's `encodeURIComponent`.
pub(crate) const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a query parameter value.
pub(crate) fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT_ENCODE_SET).to_string()
}

/// Render a preview card for `url`.
///
/// The preview image is loaded through `image_proxy_path` so the page never
/// hotlinks third-party images. Fallback metadata renders without image or
/// favicon.
#[must_use]
pub fn metadata_card(url: &str, metadata: &Metadata, image_proxy_path: &str) -> String {
    let mut html = format!(
        concat!(
            r#"<div class="embed embed-preview"><a class="embed-card" href="{href}" target="_blank" rel="noopener noreferrer">"#,
            r#"<span class="embed-card-body"><span class="embed-card-title">{title}</span>"#,
        ),
        href = escape_html(url),
        title = escape_html(metadata.display_title()),
    );

    if let Some(description) = &metadata.description {
        html.push_str(&format!(
            r#"<span class="embed-card-description">{}</span>"#,
            escape_html(description)
        ));
    }

    html.push_str(r#"<span class="embed-card-site">"#);
    match metadata.favicon.as_deref().filter(|_| !metadata.error) {
        Some(favicon) => html.push_str(&format!(
            r#"<img class="embed-card-favicon" src="{}" alt="" loading="lazy">"#,
            escape_html(favicon)
        )),
        None => html.push_str(r#"<span class="embed-card-icon" aria-hidden="true">🔗</span>"#),
    }
    html.push_str(&format!(
        r#"<span class="embed-card-domain">{}</span></span></span>"#,
        escape_html(if metadata.domain.is_empty() {
            url
        } else {
            &metadata.domain
        })
    ));

    if let Some(image) = metadata.image.as_deref().filter(|_| !metadata.error) {
        html.push_str(&format!(
            r#"<span class="embed-card-image"><img src="{}" alt="" loading="lazy"></span>"#,
            escape_html(&format!("{image_proxy_path}?url={}", encode_component(image)))
        ));
    }

    html.push_str("</a></div>");
    html
}
