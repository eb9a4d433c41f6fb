//! Block classifier.
//!
//! Splits markdown into a flat sequence of [`Block`]s, one rule per line,
//! first match wins. Code fences and `<aside>` regions are the only
//! constructs spanning several lines.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::embed::ProviderHint;
use crate::fence::{FenceLine, FenceTracker};
use crate::inline::{code_span_ranges, in_code_span};

static ORDERED_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\. (.*)$").unwrap());

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://\S+$").unwrap());

/// `[tag]body[/tag]`. The regex crate has no backreferences, so the closing
/// tag is captured separately and compared in [`directive_block`].
static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Za-z][A-Za-z0-9_-]*)\](\S+?)\[/([A-Za-z][A-Za-z0-9_-]*)\]").unwrap()
});

const ASIDE_OPEN: &str = "<aside>";
const ASIDE_CLOSE: &str = "</aside>";

/// A parsed unit of markdown content.
///
/// Text fields hold raw source text; inline formatting is applied when the
/// block is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "camelCase"))]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    ListItem { ordered: bool, text: String },
    Blockquote { text: String },
    CodeBlock { language: Option<String>, text: String },
    HorizontalRule,
    /// Blank line.
    Spacer,
    Aside { children: Vec<Block> },
    EmbedDirective { hint: ProviderHint, url: String },
    CardDirective { url: String },
    /// A line holding only a URL of no known provider.
    LinkCandidate { url: String },
}

/// Parse markdown into blocks, in source order.
///
/// Pure: the same input always yields the same blocks.
///
/// # Example
///
/// ```
/// use quill_renderer::{Block, parse_blocks};
///
/// let blocks = parse_blocks("# Title\n- item");
/// assert_eq!(blocks, vec![
///     Block::Heading { level: 1, text: "Title".to_owned() },
///     Block::ListItem { ordered: false, text: "item".to_owned() },
/// ]);
/// ```
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let lines: Vec<&str> = markdown.lines().collect();
    parse_lines(&lines)
}

struct CodeAccumulator<'a> {
    language: Option<String>,
    lines: Vec<&'a str>,
}

impl CodeAccumulator<'_> {
    fn finish(self) -> Block {
        Block::CodeBlock {
            language: self.language,
            text: self.lines.join("\n"),
        }
    }
}

fn parse_lines(lines: &[&str]) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut fence = FenceTracker::new();
    let mut code: Option<CodeAccumulator<'_>> = None;
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        match fence.update(line) {
            FenceLine::Open(language) => {
                code = Some(CodeAccumulator {
                    language: language.map(str::to_owned),
                    lines: Vec::new(),
                });
            }
            FenceLine::Inside => {
                if let Some(acc) = code.as_mut() {
                    acc.lines.push(line);
                }
            }
            FenceLine::Close => {
                if let Some(acc) = code.take() {
                    blocks.push(acc.finish());
                }
            }
            FenceLine::Outside => {
                if let Some(aside) = find_aside(lines, i) {
                    blocks.push(Block::Aside {
                        children: parse_blocks(&aside.inner),
                    });
                    if !aside.trailing.trim().is_empty() {
                        classify_line(aside.trailing, &mut blocks);
                    }
                    i = aside.end;
                } else {
                    classify_line(line, &mut blocks);
                }
            }
        }
        i += 1;
    }

    // Unclosed fence runs to end of input
    if let Some(acc) = code {
        blocks.push(acc.finish());
    }

    blocks
}

/// An `<aside>` region found in the line list.
struct AsideSpan<'a> {
    inner: String,
    /// Index of the line holding `</aside>`.
    end: usize,
    /// Text after `</aside>` on the closing line.
    trailing: &'a str,
}

/// Find an aside opening at `lines[start]` and its first closing tag.
///
/// Fences inside the aside are tracked so a `</aside>` in code does not end it.
fn find_aside<'a>(lines: &[&'a str], start: usize) -> Option<AsideSpan<'a>> {
    let rest = lines[start].trim_start().strip_prefix(ASIDE_OPEN)?;

    if let Some(idx) = rest.find(ASIDE_CLOSE) {
        return Some(AsideSpan {
            inner: rest[..idx].to_owned(),
            end: start,
            trailing: &rest[idx + ASIDE_CLOSE.len()..],
        });
    }

    let mut fence = FenceTracker::new();
    let mut inner = Vec::new();
    if !rest.trim().is_empty() {
        fence.update(rest);
        inner.push(rest);
    }

    for (j, &line) in lines.iter().enumerate().skip(start + 1) {
        if fence.update(line) == FenceLine::Outside
            && let Some(idx) = line.find(ASIDE_CLOSE)
        {
            let before = &line[..idx];
            if !before.trim().is_empty() {
                inner.push(before);
            }
            return Some(AsideSpan {
                inner: inner.join("\n"),
                end: j,
                trailing: &line[idx + ASIDE_CLOSE.len()..],
            });
        }
        inner.push(line);
    }

    None
}

/// Classify a single line outside any fence.
fn classify_line(line: &str, blocks: &mut Vec<Block>) {
    let trimmed = line.trim();

    let block = if let Some((level, text)) = heading(line) {
        Block::Heading {
            level,
            text: text.trim().to_owned(),
        }
    } else if let Some(text) = line.strip_prefix("> ") {
        Block::Blockquote {
            text: text.trim().to_owned(),
        }
    } else if trimmed == "---" || trimmed == "***" {
        Block::HorizontalRule
    } else if let Some(text) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        Block::ListItem {
            ordered: false,
            text: text.trim().to_owned(),
        }
    } else if let Some(caps) = ORDERED_ITEM.captures(line) {
        Block::ListItem {
            ordered: true,
            text: caps[1].trim().to_owned(),
        }
    } else if trimmed.is_empty() {
        Block::Spacer
    } else if BARE_URL.is_match(trimmed) {
        Block::LinkCandidate {
            url: trimmed.to_owned(),
        }
    } else {
        split_paragraph(trimmed, blocks);
        return;
    };

    blocks.push(block);
}

/// `#` to `####` followed by a space.
fn heading(line: &str) -> Option<(u8, &str)> {
    let level = line.bytes().take_while(|&b| b == b'#').count();
    if !(1..=4).contains(&level) {
        return None;
    }
    let text = line[level..].strip_prefix(' ')?;
    Some((u8::try_from(level).ok()?, text))
}

/// Emit a paragraph, splitting it around any embedded bracket directives.
fn split_paragraph(text: &str, blocks: &mut Vec<Block>) {
    let spans = code_span_ranges(text);
    let mut last = 0;

    for caps in DIRECTIVE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if in_code_span(&spans, whole.start()) {
            continue;
        }
        let Some(directive) = directive_block(&caps) else {
            continue;
        };

        push_paragraph(&text[last..whole.start()], blocks);
        blocks.push(directive);
        last = whole.end();
    }

    push_paragraph(&text[last..], blocks);
}

fn push_paragraph(text: &str, blocks: &mut Vec<Block>) {
    let text = text.trim();
    if !text.is_empty() {
        blocks.push(Block::Paragraph {
            text: text.to_owned(),
        });
    }
}

/// Build a directive block from a `[tag]body[/tag]` match.
///
/// Mismatched tags are not directives. Unknown tags only count when the body
/// looks like a URL, so bbcode-ish prose such as `[b]x[/b]` stays text.
fn directive_block(caps: &Captures<'_>) -> Option<Block> {
    let (open, body, close) = (&caps[1], &caps[2], &caps[3]);
    if !open.eq_ignore_ascii_case(close) {
        return None;
    }

    if open.eq_ignore_ascii_case("card") {
        return Some(Block::CardDirective {
            url: body.to_owned(),
        });
    }

    let hint = ProviderHint::from_tag(open);
    if !hint.is_known() && !body.contains("://") {
        return None;
    }
    Some(Block::EmbedDirective {
        hint,
        url: body.to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn paragraph(text: &str) -> Block {
        Block::Paragraph {
            text: text.to_owned(),
        }
    }

    #[test]
    fn test_plain_lines_are_paragraphs_in_order() {
        let blocks = parse_blocks("first line\nsecond line\n\nthird line");
        assert_eq!(
            blocks,
            vec![
                paragraph("first line"),
                paragraph("second line"),
                Block::Spacer,
                paragraph("third line"),
            ]
        );
    }

    #[test]
    fn test_heading_levels() {
        let blocks = parse_blocks("# One\n## Two\n### Three\n#### Four\n##### Five\n#NoSpace");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "One".to_owned()
                },
                Block::Heading {
                    level: 2,
                    text: "Two".to_owned()
                },
                Block::Heading {
                    level: 3,
                    text: "Three".to_owned()
                },
                Block::Heading {
                    level: 4,
                    text: "Four".to_owned()
                },
                paragraph("##### Five"),
                paragraph("#NoSpace"),
            ]
        );
    }

    #[test]
    fn test_quote_rule_and_lists() {
        let blocks = parse_blocks("> quoted\n---\n***\n- dash\n* star\n12. twelfth");
        assert_eq!(
            blocks,
            vec![
                Block::Blockquote {
                    text: "quoted".to_owned()
                },
                Block::HorizontalRule,
                Block::HorizontalRule,
                Block::ListItem {
                    ordered: false,
                    text: "dash".to_owned()
                },
                Block::ListItem {
                    ordered: false,
                    text: "star".to_owned()
                },
                Block::ListItem {
                    ordered: true,
                    text: "twelfth".to_owned()
                },
            ]
        );
    }

    #[test]
    fn test_code_fence_verbatim() {
        let blocks = parse_blocks("```rust\n# not a heading\n[youtube]https://youtu.be/a[/youtube]\n```");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: Some("rust".to_owned()),
                text: "# not a heading\n[youtube]https://youtu.be/a[/youtube]".to_owned(),
            }]
        );
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let blocks = parse_blocks("intro\n~~~\nline one\nline two");
        assert_eq!(
            blocks,
            vec![
                paragraph("intro"),
                Block::CodeBlock {
                    language: None,
                    text: "line one\nline two".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_aside_multiline() {
        let blocks = parse_blocks("before\n<aside>\n## Note\nInside\n</aside>\nafter");
        assert_eq!(
            blocks,
            vec![
                paragraph("before"),
                Block::Aside {
                    children: vec![
                        Block::Heading {
                            level: 2,
                            text: "Note".to_owned()
                        },
                        paragraph("Inside"),
                    ],
                },
                paragraph("after"),
            ]
        );
    }

    #[test]
    fn test_aside_single_line_with_trailing_text() {
        let blocks = parse_blocks("<aside>Short **note**</aside> then more");
        assert_eq!(
            blocks,
            vec![
                Block::Aside {
                    children: vec![paragraph("Short **note**")],
                },
                paragraph("then more"),
            ]
        );
    }

    #[test]
    fn test_aside_close_inside_fence_ignored() {
        let blocks = parse_blocks("<aside>\n```html\n</aside>\n```\n</aside>");
        assert_eq!(
            blocks,
            vec![Block::Aside {
                children: vec![Block::CodeBlock {
                    language: Some("html".to_owned()),
                    text: "</aside>".to_owned(),
                }],
            }]
        );
    }

    #[test]
    fn test_aside_inside_fence_is_code() {
        let blocks = parse_blocks("```\n<aside>x</aside>\n```");
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "<aside>x</aside>".to_owned(),
            }]
        );
    }

    #[test]
    fn test_unclosed_aside_is_paragraph() {
        let blocks = parse_blocks("<aside>\ntext");
        assert_eq!(blocks, vec![paragraph("<aside>"), paragraph("text")]);
    }

    #[test]
    fn test_directives() {
        let blocks = parse_blocks(
            "[youtube]https://youtu.be/a[/youtube]\n[CARD]https://example.com[/card]\n[embed]https://x.com/a/status/1[/embed]",
        );
        assert_eq!(
            blocks,
            vec![
                Block::EmbedDirective {
                    hint: ProviderHint::YouTube,
                    url: "https://youtu.be/a".to_owned(),
                },
                Block::CardDirective {
                    url: "https://example.com".to_owned(),
                },
                Block::EmbedDirective {
                    hint: ProviderHint::Auto,
                    url: "https://x.com/a/status/1".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_directive_mid_paragraph_splits() {
        let blocks = parse_blocks(
            "Visit [bluesky]https://bsky.app/profile/alice.test/post/xyz[/bluesky] today",
        );
        assert_eq!(
            blocks,
            vec![
                paragraph("Visit"),
                Block::EmbedDirective {
                    hint: ProviderHint::Bluesky,
                    url: "https://bsky.app/profile/alice.test/post/xyz".to_owned(),
                },
                paragraph("today"),
            ]
        );
    }

    #[test]
    fn test_embed_syntax_in_inline_code_stays_text() {
        let source = "Use `{youtube:https://youtu.be/abcdefghijk}` to embed";
        assert_eq!(
            parse_blocks(&crate::normalize::normalize(source)),
            vec![paragraph(source)]
        );

        let blocks = parse_blocks("Write `[card]https://a.io[/card]` or [card]https://b.io[/card]");
        assert_eq!(
            blocks,
            vec![
                paragraph("Write `[card]https://a.io[/card]` or"),
                Block::CardDirective {
                    url: "https://b.io".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn test_mismatched_and_bbcode_tags_stay_text() {
        let blocks = parse_blocks("[youtube]https://youtu.be/a[/twitter]\n[b]bold[/b]");
        assert_eq!(
            blocks,
            vec![
                paragraph("[youtube]https://youtu.be/a[/twitter]"),
                paragraph("[b]bold[/b]"),
            ]
        );
    }

    #[test]
    fn test_unknown_tag_with_url_is_directive() {
        let blocks = parse_blocks("[vimeo]https://vimeo.com/1[/vimeo]");
        assert_eq!(
            blocks,
            vec![Block::EmbedDirective {
                hint: ProviderHint::Unsupported("vimeo".to_owned()),
                url: "https://vimeo.com/1".to_owned(),
            }]
        );
    }

    #[test]
    fn test_bare_url_is_link_candidate() {
        let blocks = parse_blocks("  https://example.com/post  \nsee https://example.com");
        assert_eq!(
            blocks,
            vec![
                Block::LinkCandidate {
                    url: "https://example.com/post".to_owned(),
                },
                paragraph("see https://example.com"),
            ]
        );
    }

    #[test]
    fn test_parse_is_pure() {
        let input = "# A\n<aside>\nB\n</aside>\n```\nC\n```\n[card]https://a.io[/card]";
        assert_eq!(parse_blocks(input), parse_blocks(input));
    }
}
