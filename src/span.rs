//! Byte spans over module source text.
//!
//! Every token, AST node, and reference carries a `[start, end)` byte
//! range into its module's original source. Spans survive all the way to
//! the renderer, which edits the original text by offset, and to the
//! source-map builder, which converts them to line/column positions.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// A half-open `[start, end)` byte range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    /// Smallest span containing both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// The spanned slice of `source`.
    pub fn text(self, source: &str) -> &str {
        &source[self.range()]
    }

    pub fn range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_takes_the_union() {
        let a = Span::new(3, 7);
        let b = Span::new(5, 12);
        assert_eq!(a.cover(b), Span::new(3, 12));
        assert_eq!(b.cover(a), Span::new(3, 12));
    }

    #[test]
    fn text_slices_the_source() {
        let source = "let a = 1;";
        assert_eq!(Span::new(4, 5).text(source), "a");
        assert_eq!(Span::new(0, 3).text(source), "let");
    }

    #[test]
    fn empty_span() {
        assert!(Span::new(4, 4).is_empty());
        assert_eq!(Span::new(4, 4).len(), 0);
        assert_eq!(Span::new(2, 6).len(), 4);
    }
}
