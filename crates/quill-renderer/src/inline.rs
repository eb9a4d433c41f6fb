//! Inline formatter.
//!
//! Turns one line of raw text into inline HTML. The whole line is escaped
//! before any markup is inserted; every later step only ever sees escaped
//! text, so user input cannot smuggle tags through the patterns below.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::escape::escape_html;

static CODE_SPAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*").unwrap());
static ITALIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*]+)\*").unwrap());
static IMAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").unwrap());
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").unwrap());
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<(\d+)>").unwrap());

/// Format a single line of raw text as inline HTML.
///
/// Order: escape, code spans, images, links, then bold and italic. Code
/// span contents are not formatted further, and emphasis never reaches a
/// link or image target.
///
/// # Example
///
/// ```
/// use quill_renderer::format_inline;
///
/// assert_eq!(
///     format_inline("**<b>** and `x < y`"),
///     "<strong>&lt;b&gt;</strong> and <code>x &lt; y</code>"
/// );
/// ```
#[must_use]
pub fn format_inline(text: &str) -> String {
    let escaped = escape_html(text);
    let mut output = String::with_capacity(escaped.len());
    let mut last = 0;

    for caps in CODE_SPAN.captures_iter(&escaped) {
        let Some(span) = caps.get(0) else { continue };
        output.push_str(&format_spans(&escaped[last..span.start()]));
        output.push_str("<code>");
        output.push_str(&caps[1]);
        output.push_str("</code>");
        last = span.end();
    }
    output.push_str(&format_spans(&escaped[last..]));

    output
}

/// Apply images, links and emphasis to escaped text outside code spans.
///
/// Rendered images and links are parked as `<N>` tokens while emphasis runs.
/// Escaped text holds no `<`, so tokens cannot collide with input.
fn format_spans(escaped: &str) -> String {
    if escaped.is_empty() {
        return String::new();
    }

    let mut rendered = Vec::new();
    let text = IMAGE.replace_all(escaped, |caps: &Captures<'_>| {
        let (alt, src) = (&caps[1], &caps[2]);
        let html = if is_safe_href(src) {
            format!(r#"<img src="{src}" alt="{alt}" loading="lazy">"#)
        } else {
            alt.to_owned()
        };
        stash(&mut rendered, html)
    });
    let text = LINK.replace_all(&text, |caps: &Captures<'_>| {
        let label = restore(&emphasis(&caps[1]), &rendered);
        let href = &caps[2];
        let html = if !is_safe_href(href) {
            label
        } else if is_external(href) {
            format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{label}</a>"#)
        } else {
            format!(r#"<a href="{href}">{label}</a>"#)
        };
        stash(&mut rendered, html)
    });

    restore(&emphasis(&text), &rendered)
}

fn emphasis(text: &str) -> String {
    let text = BOLD.replace_all(text, "<strong>${1}</strong>");
    ITALIC.replace_all(&text, "<em>${1}</em>").into_owned()
}

fn stash(rendered: &mut Vec<String>, html: String) -> String {
    rendered.push(html);
    format!("<{}>", rendered.len() - 1)
}

fn restore(text: &str, rendered: &[String]) -> String {
    TOKEN
        .replace_all(text, |caps: &Captures<'_>| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| rendered.get(index))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Byte ranges of backtick code spans, paired the way [`format_inline`]
/// pairs them.
pub(crate) fn code_span_ranges(text: &str) -> Vec<Range<usize>> {
    CODE_SPAN.find_iter(text).map(|m| m.range()).collect()
}

pub(crate) fn in_code_span(spans: &[Range<usize>], position: usize) -> bool {
    spans.iter().any(|span| span.contains(&position))
}

/// Allow `http`, `https`, `mailto` and scheme-less (relative) targets.
pub(crate) fn is_safe_href(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("mailto:")
    {
        return true;
    }
    // Relative: no scheme before the first path, query or fragment delimiter
    let head = lower.split(['/', '?', '#']).next().unwrap_or_default();
    !head.contains(':') && !lower.starts_with("//")
}

fn is_external(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(format_inline("Just words."), "Just words.");
    }

    #[test]
    fn test_bold_and_italic() {
        assert_eq!(
            format_inline("**bold** and *italic*"),
            "<strong>bold</strong> and <em>italic</em>"
        );
    }

    #[test]
    fn test_code_span_protects_contents() {
        assert_eq!(
            format_inline("`**not bold**` but **bold**"),
            "<code>**not bold**</code> but <strong>bold</strong>"
        );
    }

    #[test]
    fn test_script_in_bold_is_escaped() {
        assert_eq!(
            format_inline("**<script>alert('x')</script>**"),
            "<strong>&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;</strong>"
        );
    }

    #[test]
    fn test_link_external() {
        assert_eq!(
            format_inline("see [docs](https://example.com/a?b=1&c=2)"),
            r#"see <a href="https://example.com/a?b=1&amp;c=2" target="_blank" rel="noopener noreferrer">docs</a>"#
        );
    }

    #[test]
    fn test_link_relative() {
        assert_eq!(
            format_inline("[home](/posts/1)"),
            r#"<a href="/posts/1">home</a>"#
        );
    }

    #[test]
    fn test_javascript_link_dropped() {
        // The link target stops at the first `)`, the stray one stays as text
        assert_eq!(format_inline("[click](javascript:alert(1))"), "click)");
    }

    #[test]
    fn test_quote_cannot_break_attribute() {
        let html = format_inline(r#"[x](https://a.io/"onmouseover="alert(1))"#);
        assert!(!html.contains(r#"""onmouseover"#));
        assert!(html.contains("&quot;onmouseover=&quot;"));
    }

    #[test]
    fn test_image() {
        assert_eq!(
            format_inline("![a cat](https://img.example/cat.png)"),
            r#"<img src="https://img.example/cat.png" alt="a cat" loading="lazy">"#
        );
    }

    #[test]
    fn test_data_image_dropped() {
        assert_eq!(format_inline("![x](data:text/html,hi)"), "x");
    }

    #[test]
    fn test_no_raw_specials_survive() {
        let html = format_inline(r#"a < b > c & "d" 'e'"#);
        assert_eq!(html, "a &lt; b &gt; c &amp; &quot;d&quot; &#x27;e&#x27;");
    }

    #[test]
    fn test_emphasis_markers_in_targets_untouched() {
        assert_eq!(
            format_inline("[a](https://x.io/a*b*c)"),
            r#"<a href="https://x.io/a*b*c" target="_blank" rel="noopener noreferrer">a</a>"#
        );
        assert_eq!(
            format_inline("![pic](/img/**x**.png) *after*"),
            r#"<img src="/img/**x**.png" alt="pic" loading="lazy"> <em>after</em>"#
        );
    }

    #[test]
    fn test_link_label_emphasis() {
        assert_eq!(
            format_inline("[**docs**](/docs) and *more*"),
            r#"<a href="/docs"><strong>docs</strong></a> and <em>more</em>"#
        );
    }

    #[test]
    fn test_image_inside_link() {
        assert_eq!(
            format_inline("[![logo](/logo.png)](/home)"),
            r#"<a href="/home"><img src="/logo.png" alt="logo" loading="lazy"></a>"#
        );
    }

    #[test]
    fn test_code_span_ranges() {
        let text = "a `b` c `d`";
        assert_eq!(code_span_ranges(text), vec![2..5, 8..11]);
        assert!(in_code_span(&code_span_ranges(text), 3));
        assert!(!in_code_span(&code_span_ranges(text), 6));
    }

    #[test]
    fn test_safe_href() {
        assert!(is_safe_href("https://a.io"));
        assert!(is_safe_href("MAILTO:me@a.io"));
        assert!(is_safe_href("posts/1"));
        assert!(is_safe_href("#top"));
        assert!(!is_safe_href("javascript:alert(1)"));
        assert!(!is_safe_href("//evil.example"));
    }
}
