//! Embed syntax normalizer.
//!
//! Rewrites the alternate embed notations into the canonical bracket form
//! before block parsing:
//!
//! - `{{card:URL}}` → `[card]URL[/card]`
//! - `{type:URL}` → `[type]URL[/type]`
//! - a line holding only a bare provider URL → `[embed]URL[/embed]`
//!
//! Fenced code and inline backtick spans are copied through untouched.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::embed::{EmbedType, detect_embed_type};
use crate::fence::{FenceLine, FenceTracker};
use crate::inline::{code_span_ranges, in_code_span};

static CARD_BRACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{card:(https?://[^{}\s]+)\}\}").unwrap());

static TYPE_BRACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z][A-Za-z0-9_-]*):(https?://[^{}\s]+)\}").unwrap()
});

static BARE_URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://\S+$").unwrap());

/// Line-based embed syntax normalizer.
///
/// # Example
///
/// ```
/// use quill_renderer::EmbedNormalizer;
///
/// let mut normalizer = EmbedNormalizer::new();
/// let output = normalizer.process("Look: {twitter:https://x.com/a/status/1}\n");
///
/// assert_eq!(output, "Look: [twitter]https://x.com/a/status/1[/twitter]\n");
/// assert_eq!(normalizer.rewritten(), 1);
/// ```
#[derive(Debug, Default)]
pub struct EmbedNormalizer {
    fence: FenceTracker,
    rewritten: usize,
}

impl EmbedNormalizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rewrites made so far.
    #[must_use]
    pub fn rewritten(&self) -> usize {
        self.rewritten
    }

    /// Normalize `input`, preserving line endings.
    pub fn process(&mut self, input: &str) -> String {
        let mut output = String::with_capacity(input.len());

        for line in input.split_inclusive('\n') {
            let (content, ending) = split_line_ending(line);
            output.push_str(&self.process_line(content));
            output.push_str(ending);
        }

        output
    }

    fn process_line<'a>(&mut self, line: &'a str) -> Cow<'a, str> {
        if self.fence.update(line) != FenceLine::Outside {
            return Cow::Borrowed(line);
        }

        let mut current = Cow::Borrowed(line);
        for (pattern, replacement) in [
            (&*CARD_BRACES, "[card]${1}[/card]"),
            (&*TYPE_BRACES, "[${1}]${2}[/${1}]"),
        ] {
            let spans = code_span_ranges(&current);
            let mut count = 0;
            let replaced = pattern.replace_all(&current, |caps: &Captures<'_>| {
                let mut out = String::new();
                match caps.get(0) {
                    Some(whole) if !in_code_span(&spans, whole.start()) => {
                        count += 1;
                        caps.expand(replacement, &mut out);
                    }
                    _ => out.push_str(&caps[0]),
                }
                out
            });
            if count > 0 {
                self.rewritten += count;
                let replaced = replaced.into_owned();
                current = Cow::Owned(replaced);
            }
        }

        let trimmed = current.trim();
        if BARE_URL.is_match(trimmed) && detect_embed_type(trimmed) != EmbedType::Unknown {
            self.rewritten += 1;
            return Cow::Owned(format!("[embed]{trimmed}[/embed]"));
        }

        current
    }
}

/// Normalize embed syntax in a whole document.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let mut normalizer = EmbedNormalizer::new();
    let output = normalizer.process(raw);
    if normalizer.rewritten() > 0 {
        tracing::debug!(rewritten = normalizer.rewritten(), "Normalized embed syntax");
    }
    output
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}
