//! Regex-based HTML head scraping.
//!
//! Pages are not parsed as HTML. Tags are located with regexes and their
//! attributes read in any order, which is enough for `<meta>`, `<link>` and
//! `<title>` in the wild.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static META_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").unwrap());

static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)([a-z][a-z0-9:_-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).unwrap()
});

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>([^<]*)</title>").unwrap());

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(amp|lt|gt|quot|apos|#39|#x27);").unwrap());

/// Values scraped from a page head.
#[derive(Debug, Default)]
pub(crate) struct PageHead {
    /// Meta content keyed by lowercase `property` or `name`; first tag wins.
    meta: HashMap<String, String>,
    title: Option<String>,
    icon: Option<String>,
}

impl PageHead {
    pub(crate) fn parse(html: &str) -> Self {
        let mut head = Self::default();

        for tag in META_TAG.find_iter(html) {
            let attrs = attributes(tag.as_str());
            let Some(content) = attrs.get("content") else {
                continue;
            };
            for key in ["property", "name"] {
                if let Some(name) = attrs.get(key) {
                    head.meta
                        .entry(name.to_ascii_lowercase())
                        .or_insert_with(|| content.clone());
                }
            }
        }

        head.icon = LINK_TAG.find_iter(html).find_map(|tag| {
            let attrs = attributes(tag.as_str());
            let rel = attrs.get("rel")?.to_ascii_lowercase();
            if rel == "icon" || rel == "shortcut icon" {
                attrs.get("href").cloned()
            } else {
                None
            }
        });

        head.title = TITLE
            .captures(html)
            .map(|caps| decode_entities(caps[1].trim()))
            .filter(|title| !title.is_empty());

        head
    }

    /// Trimmed, entity-decoded content of the first non-empty meta tag.
    pub(crate) fn meta(&self, key: &str) -> Option<String> {
        self.meta
            .get(key)
            .map(|value| decode_entities(value.trim()))
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn title(&self) -> Option<String> {
        self.title.clone()
    }

    pub(crate) fn icon(&self) -> Option<String> {
        self.icon.as_deref().map(decode_entities)
    }
}

/// Attributes of one tag, keys lowercased.
fn attributes(tag: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag)
        .map(|caps| {
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (caps[1].to_ascii_lowercase(), value.to_owned())
        })
        .collect()
}

/// Decode the handful of entities common in head values.
pub(crate) fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_owned();
    }
    ENTITY
        .replace_all(value, |caps: &regex::Captures<'_>| match &caps[1] {
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "'",
        })
        .into_owned()
}

/// Resolve a head reference against the page origin.
///
/// Absolute URLs are kept, `//host/x` takes the page scheme, and both
/// `/path` and a bare `path` resolve from the origin root, not the page's
/// directory. Only HTTP(S) results are returned.
pub(crate) fn absolutize(page: &Url, reference: &str) -> Option<String> {
    let reference = reference.trim();
    let resolved = if reference.starts_with('/') {
        page.join(reference)
    } else {
        match Url::parse(reference) {
            Err(url::ParseError::RelativeUrlWithoutBase) => page.join(&format!("/{reference}")),
            other => other,
        }
    };
    resolved
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .map(String::from)
}
