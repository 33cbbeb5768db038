use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Half-open byte range `[start, end)` into the function source.
///
/// Spans come from the external parser with the tree. Nodes that a pass
/// creates without a source counterpart get [`Span::synthetic`]. Lines and
/// columns are only needed for diagnostics; see [`LineIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "inverted span {start}..{end}");
        Span { start, end }
    }

    /// Position of a node built by a pass rather than parsed.
    pub fn synthetic() -> Self {
        Span::default()
    }

    pub fn to_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

/// Maps byte offsets to 1-based line and column numbers.
#[derive(Debug)]
pub struct LineIndex {
    /// Offset just past each `\n`, preceded by 0 for the first line.
    newlines: Vec<u32>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let newlines = std::iter::once(0)
            .chain(
                source
                    .match_indices('\n')
                    .map(|(offset, _)| offset as u32 + 1),
            )
            .collect();
        LineIndex { newlines }
    }

    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line = self.newlines.partition_point(|&start| start <= offset).max(1) - 1;
        (line as u32 + 1, offset - self.newlines[line] + 1)
    }
}
