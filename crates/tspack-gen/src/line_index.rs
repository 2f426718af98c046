//! Byte offset → line/column lookup.

/// Line start table for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<u32>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i as u32 + 1),
        );
        Self { text, line_starts }
    }

    /// 1-based line and column of a byte offset. Columns count UTF-16 code
    /// units, the unit source maps use.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let offset = offset.min(self.text.len() as u32);
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let start = self.line_starts[line] as usize;
        let prefix = self.text.get(start..offset as usize).unwrap_or("");
        (line as u32 + 1, prefix.encode_utf16().count() as u32 + 1)
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn offsets_map_to_one_based_positions() {
        let index = LineIndex::new("ab\ncd\n\nef");
        assert_eq!(index.line_col(0), (1, 1));
        assert_eq!(index.line_col(1), (1, 2));
        assert_eq!(index.line_col(3), (2, 1));
        assert_eq!(index.line_col(6), (3, 1));
        assert_eq!(index.line_col(8), (4, 2));
        assert_eq!(index.line_count(), 4);
    }

    #[test]
    fn columns_count_utf16_units() {
        let index = LineIndex::new("é😀x");
        // é is 2 bytes / 1 unit, 😀 is 4 bytes / 2 units.
        assert_eq!(index.line_col(6), (1, 4));
    }

    #[test]
    fn out_of_range_offsets_clamp() {
        let index = LineIndex::new("a\nb");
        assert_eq!(index.line_col(100), (2, 2));
    }

    proptest! {
        #[test]
        fn lines_count_preceding_newlines(text in "[a-z\\n é]{0,40}") {
            let index = LineIndex::new(&text);
            for (offset, _) in text.char_indices() {
                let (line, col) = index.line_col(offset as u32);
                let before = &text[..offset];
                prop_assert_eq!(line as usize, before.matches('\n').count() + 1);
                let line_start = before.rfind('\n').map_or(0, |i| i + 1);
                prop_assert_eq!(col as usize, before[line_start..].encode_utf16().count() + 1);
            }
        }
    }
}
