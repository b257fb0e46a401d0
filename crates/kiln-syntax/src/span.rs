//! Source locations carried by every tree node.

use serde::{Deserialize, Serialize};

/// Byte range plus 1-based line/column of the first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// A span on `line`, column 1, with an empty byte range. Handy for
    /// synthesized nodes.
    pub fn at_line(line: u32) -> Self {
        Self::new(0, 0, line, 1)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn merge(&self, other: &Span) -> Span {
        let (line, column) = if (other.line, other.column) < (self.line, self.column) {
            (other.line, other.column)
        } else {
            (self.line, self.column)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earliest_position() {
        let a = Span::new(10, 20, 2, 5);
        let b = Span::new(4, 12, 1, 9);
        let merged = a.merge(&b);
        assert_eq!(merged.start, 4);
        assert_eq!(merged.end, 20);
        assert_eq!((merged.line, merged.column), (1, 9));
    }

    #[test]
    fn test_len_saturates() {
        assert_eq!(Span::new(5, 3, 1, 1).len(), 0);
        assert!(Span::new(5, 3, 1, 1).is_empty());
        assert_eq!(Span::new(3, 5, 1, 1).len(), 2);
    }
}
