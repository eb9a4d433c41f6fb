//! Code fence tracking for line-based processing.
//!
//! Both the embed normalizer and the block parser walk content line by line
//! and must leave fenced code untouched, so they share this tracker.

/// What a line meant to the fence state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum FenceLine<'a> {
    /// The line opens a fence. Carries the info string (language tag), if any.
    Open(Option<&'a str>),
    /// The line closes the current fence.
    Close,
    /// A line inside an open fence.
    Inside,
    /// A line outside any fence.
    Outside,
}

/// Tracks code fence state during line-by-line processing.
///
/// Fences use backticks or tildes (three or more). The closing fence must
/// use the same character and be at least as long as the opening fence.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    fence_char: Option<char>,
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Update fence state based on a line and classify it.
    pub(crate) fn update<'a>(&mut self, line: &'a str) -> FenceLine<'a> {
        let trimmed = line.trim_start();

        if let Some(fence_char) = self.fence_char {
            if is_closing_fence(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return FenceLine::Close;
            }
            return FenceLine::Inside;
        }

        match detect_fence(trimmed) {
            Some((ch, len)) => {
                self.fence_char = Some(ch);
                self.fence_len = len;
                let info = trimmed[len..].trim();
                let language = info.split_whitespace().next();
                FenceLine::Open(language)
            }
            None => FenceLine::Outside,
        }
    }
}

/// Detect if a line starts a code fence, returning its character and length.
fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    // A backtick info string cannot contain backticks (that is inline code)
    if count < 3 || (first == '`' && trimmed[count..].contains('`')) {
        return None;
    }
    Some((first, count))
}

/// Closing fence: same character, at least as long, nothing but whitespace after.
fn is_closing_fence(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }

    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    count >= min_len && trimmed[count..].chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtick_fence_with_language() {
        let mut tracker = FenceTracker::new();

        assert_eq!(tracker.update("```rust"), FenceLine::Open(Some("rust")));
        assert!(tracker.in_fence());
        assert_eq!(tracker.update("fn main() {}"), FenceLine::Inside);
        assert_eq!(tracker.update("```"), FenceLine::Close);
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_tilde_fence_without_language() {
        let mut tracker = FenceTracker::new();

        assert_eq!(tracker.update("~~~"), FenceLine::Open(None));
        assert_eq!(tracker.update("~~~"), FenceLine::Close);
    }

    #[test]
    fn test_shorter_fence_not_closing() {
        let mut tracker = FenceTracker::new();

        tracker.update("````");
        assert_eq!(tracker.update("```"), FenceLine::Inside);
        assert_eq!(tracker.update("`````"), FenceLine::Close);
    }

    #[test]
    fn test_mixed_fence_chars() {
        let mut tracker = FenceTracker::new();

        tracker.update("```");
        assert_eq!(tracker.update("~~~"), FenceLine::Inside);
        assert_eq!(tracker.update("```"), FenceLine::Close);
    }

    #[test]
    fn test_closing_fence_with_info_is_content() {
        let mut tracker = FenceTracker::new();

        tracker.update("```");
        assert_eq!(tracker.update("```js"), FenceLine::Inside);
        assert!(tracker.in_fence());
    }

    #[test]
    fn test_indented_fence() {
        let mut tracker = FenceTracker::new();

        assert_eq!(tracker.update("   ```py"), FenceLine::Open(Some("py")));
        assert_eq!(tracker.update("  ```"), FenceLine::Close);
    }

    #[test]
    fn test_inline_code_not_fence() {
        let mut tracker = FenceTracker::new();

        assert_eq!(tracker.update("``inline``"), FenceLine::Outside);
        assert_eq!(tracker.update("```inline```"), FenceLine::Outside);
        assert!(!tracker.in_fence());
    }
}
