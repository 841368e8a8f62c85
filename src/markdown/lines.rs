// src/markdown/lines.rs
// Byte offset -> (line, column), both 1-based. Columns count characters.

pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    pub fn locate(&self, text: &str, offset: usize) -> (usize, usize) {
        // starts[0] == 0 <= offset, so line is at least 1
        let line = self.starts.partition_point(|&start| start <= offset);
        let line_start = self.starts.get(line.saturating_sub(1)).copied().unwrap_or(0);
        let column = text
            .get(line_start..offset)
            .map_or(1, |prefix| prefix.chars().count() + 1);
        (line, column)
    }
}
