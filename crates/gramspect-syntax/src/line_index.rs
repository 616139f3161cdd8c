//! Offset to line/column conversion.

use gramspect_core::SourceLocation;
use rowan::TextSize;

/// Precomputed newline offsets for a source text. Lines are 1-based,
/// columns 0-based (UTF-8 offsets within the line).
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i as u32 + 1);
            }
        }
        Self { line_starts }
    }

    pub fn location(&self, offset: TextSize) -> SourceLocation {
        let offset = u32::from(offset);
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        SourceLocation::new(line as u32 + 1, offset - self.line_starts[line])
    }
}
