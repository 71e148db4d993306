use serde::{Deserialize, Serialize};

/// Byte offsets `start..end` into the source a node was parsed from.
///
/// Nodes made up by the compiler or by the engine have no span at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Parsers hand out `0..0` or inverted offsets for generated nodes;
    /// only a non-empty, ordered span can be pointed at.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }
}

/// Offsets of every line start in a source text, for turning span offsets
/// into `line:column` positions.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| (i + 1) as u32))
            .collect();
        Self { line_starts }
    }

    /// 1-based line and column of `offset`.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        (line as u32 + 1, offset - self.line_starts[line] + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_spans_are_not_valid() {
        assert!(Span::new(5, 10).is_valid());
        assert!(!Span::new(0, 0).is_valid());
        assert!(!Span { start: 9, end: 3 }.is_valid());
    }

    #[test]
    fn line_and_column() {
        let idx = LineIndex::new("def x = 1\nx.foo\nprintln x");
        assert_eq!(idx.line_col(0), (1, 1));
        assert_eq!(idx.line_col(10), (2, 1));
        assert_eq!(idx.line_col(12), (2, 3));
        assert_eq!(idx.line_col(16), (3, 1));
    }

    #[test]
    fn offset_past_the_last_newline() {
        let idx = LineIndex::new("a\n");
        assert_eq!(idx.line_col(2), (2, 1));
    }
}
