//! Embed type detection and routing.
//!
//! Classifies URLs into provider types, extracts provider IDs, and decides
//! how each embed directive is rendered. Everything here is pure.

use std::sync::LazyLock;

use regex::Regex;

static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\(\s*([^)\s]+)\s*\)$").unwrap());

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i:youtube\.com/watch\?v=|youtu\.be/|youtube\.com/embed/|youtube\.com/v/)([^&\n?#]+)",
    )
    .unwrap()
});

/// `v=` anywhere in a `watch?` query, e.g. `watch?feature=share&v=ID`.
static YOUTUBE_QUERY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:youtube\.com/watch\?)(?:[^#\n]*&)?v=([^&\n?#]+)").unwrap());

static TWEET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:twitter\.com|x\.com)/[^/]+/(?i:status(?:es)?)/(\d+)").unwrap()
});

static BLUESKY_POST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i:bsky\.app/profile/)([^/]+)/post/([^/?#]+)").unwrap());

const YOUTUBE_MARKERS: [&str; 4] = [
    "youtube.com/watch",
    "youtu.be/",
    "youtube.com/embed/",
    "youtube.com/v/",
];

/// Provider type of a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EmbedType {
    YouTube,
    Twitter,
    Bluesky,
    Unknown,
}

impl EmbedType {
    /// Lowercase name, as used in bracket tags and `data-embed-kind`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Twitter => "twitter",
            Self::Bluesky => "bluesky",
            Self::Unknown => "unknown",
        }
    }
}

/// Provider requested by an embed directive's bracket tag.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ProviderHint {
    /// `[embed]`: detect the provider from the URL.
    Auto,
    YouTube,
    /// `[twitter]` or `[x]`.
    Twitter,
    Bluesky,
    /// Any other tag. Carries the lowercased tag name.
    Unsupported(String),
}

impl ProviderHint {
    /// Map a bracket tag (case-insensitive) to a hint.
    ///
    /// `card` is not a provider and maps to `Unsupported("card")`; the block
    /// parser handles it before asking.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "embed" => Self::Auto,
            "youtube" => Self::YouTube,
            "twitter" | "x" => Self::Twitter,
            "bluesky" => Self::Bluesky,
            other => Self::Unsupported(other.to_owned()),
        }
    }

    /// Whether the tag names a provider the router knows.
    #[must_use]
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}

/// `{handle, rkey}` taken from a `bsky.app` post URL.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BlueskyUrlParts {
    pub handle: String,
    pub rkey: String,
}

/// How a single embed should be rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EmbedTarget {
    YouTube { url: String, video_id: String },
    Tweet { url: String, tweet_id: String },
    /// Needs handle to DID resolution before it can render.
    Bluesky { url: String, post: BlueskyUrlParts },
    /// Needs page metadata before it can render.
    Card { url: String },
    /// Generic external link card.
    Link { url: String },
    /// Tag the router does not know; rendered like [`EmbedTarget::Link`].
    Unsupported { name: String, url: String },
    /// The URL failed to parse.
    InvalidUrl { input: String },
    /// Provider matched but its ID could not be extracted.
    InvalidProvider { kind: EmbedType, url: String },
}

impl EmbedTarget {
    /// Whether rendering requires network access.
    #[must_use]
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Bluesky { .. } | Self::Card { .. })
    }

    /// The URL this target points at (the raw input for invalid URLs).
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::YouTube { url, .. }
            | Self::Tweet { url, .. }
            | Self::Bluesky { url, .. }
            | Self::Card { url }
            | Self::Link { url }
            | Self::Unsupported { url, .. }
            | Self::InvalidProvider { url, .. } => url,
            Self::InvalidUrl { input } => input,
        }
    }
}

/// Classify a URL by provider. Case-insensitive, substring based.
#[must_use]
pub fn detect_embed_type(url: &str) -> EmbedType {
    let lower = url.to_lowercase();

    if YOUTUBE_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return EmbedType::YouTube;
    }
    if (lower.contains("twitter.com/") || lower.contains("x.com/")) && lower.contains("/status/") {
        return EmbedType::Twitter;
    }
    if lower.contains("bsky.app/profile/") && lower.contains("/post/") {
        return EmbedType::Bluesky;
    }
    EmbedType::Unknown
}

/// Strip `[text](url)` and `<url>` wrapping and surrounding whitespace.
#[must_use]
pub fn extract_clean_url(input: &str) -> String {
    let trimmed = input.trim();

    if let Some(caps) = MARKDOWN_LINK.captures(trimmed) {
        return caps[1].to_owned();
    }
    if let Some(inner) = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
    {
        return inner.trim().to_owned();
    }
    trimmed.to_owned()
}

#[must_use]
pub fn extract_youtube_id(url: &str) -> Option<String> {
    YOUTUBE_ID
        .captures(url)
        .or_else(|| YOUTUBE_QUERY_ID.captures(url))
        .map(|caps| caps[1].to_owned())
}

#[must_use]
pub fn extract_tweet_id(url: &str) -> Option<String> {
    TWEET_ID.captures(url).map(|caps| caps[1].to_owned())
}

#[must_use]
pub fn parse_bluesky_url(url: &str) -> Option<BlueskyUrlParts> {
    BLUESKY_POST.captures(url).map(|caps| BlueskyUrlParts {
        handle: caps[1].to_owned(),
        rkey: caps[2].to_owned(),
    })
}

/// Whether `url` parses as an absolute `http`/`https` URL.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    url::Url::parse(url)
        .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some())
}

/// Route an embed directive to its render target.
///
/// Malformed URLs fail first; an explicit provider hint then requires that
/// provider's ID extraction to succeed.
#[must_use]
pub fn route_embed(hint: &ProviderHint, raw: &str) -> EmbedTarget {
    let url = extract_clean_url(raw);
    if !is_valid_url(&url) {
        return EmbedTarget::InvalidUrl { input: url };
    }

    let kind = match hint {
        ProviderHint::Auto => detect_embed_type(&url),
        ProviderHint::YouTube => EmbedType::YouTube,
        ProviderHint::Twitter => EmbedType::Twitter,
        ProviderHint::Bluesky => EmbedType::Bluesky,
        ProviderHint::Unsupported(name) => {
            return EmbedTarget::Unsupported {
                name: name.clone(),
                url,
            };
        }
    };

    route_provider(kind, url)
}

/// Route a `[card]` directive.
#[must_use]
pub fn route_card(raw: &str) -> EmbedTarget {
    let url = extract_clean_url(raw);
    if is_valid_url(&url) {
        EmbedTarget::Card { url }
    } else {
        EmbedTarget::InvalidUrl { input: url }
    }
}

fn route_provider(kind: EmbedType, url: String) -> EmbedTarget {
    let routed = match kind {
        EmbedType::YouTube => {
            extract_youtube_id(&url).map(|video_id| EmbedTarget::YouTube {
                url: url.clone(),
                video_id,
            })
        }
        EmbedType::Twitter => extract_tweet_id(&url).map(|tweet_id| EmbedTarget::Tweet {
            url: url.clone(),
            tweet_id,
        }),
        EmbedType::Bluesky => parse_bluesky_url(&url).map(|post| EmbedTarget::Bluesky {
            url: url.clone(),
            post,
        }),
        EmbedType::Unknown => return EmbedTarget::Link { url },
    };

    routed.unwrap_or(EmbedTarget::InvalidProvider { kind, url })
}
