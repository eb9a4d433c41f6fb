//! Single-pass string replacement for post-processing.

/// Collects placeholder replacements and applies them together.
///
/// Processors register `(placeholder, html)` pairs while resolving embeds;
/// [`apply`](Self::apply) then rewrites the document once.
///
/// # Example
///
/// ```
/// use quill_renderer::Replacements;
///
/// let mut html = "<p>a</p><!--quill-embed:0--><p>b</p>".to_owned();
/// let mut replacements = Replacements::new();
/// replacements.add("<!--quill-embed:0-->", "<div class=\"embed\"></div>");
/// replacements.apply(&mut html);
///
/// assert_eq!(html, "<p>a</p><div class=\"embed\"></div><p>b</p>");
/// ```
#[derive(Debug, Default)]
pub struct Replacements {
    items: Vec<(String, String)>,
}

impl Replacements {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    /// Register a replacement of every occurrence of `from` with `to`.
    pub fn add(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.items.push((from.into(), to.into()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Apply all registered replacements in one pass over `html`.
    ///
    /// Text produced by a replacement is never matched again.
    pub fn apply(self, html: &mut String) {
        if self.items.is_empty() {
            return;
        }

        let mut output = String::with_capacity(html.len());
        let mut rest = html.as_str();

        while let Some((pos, index)) = self.earliest_match(rest) {
            let (from, to) = &self.items[index];
            output.push_str(&rest[..pos]);
            output.push_str(to);
            rest = &rest[pos + from.len()..];
        }
        output.push_str(rest);

        *html = output;
    }

    /// Earliest match in `haystack`; ties go to the first registered pattern.
    fn earliest_match(&self, haystack: &str) -> Option<(usize, usize)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, (from, _))| !from.is_empty())
            .filter_map(|(index, (from, _))| haystack.find(from.as_str()).map(|pos| (pos, index)))
            .min()
    }
}
