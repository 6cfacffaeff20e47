//! Sliding window text chunking with boundary snapping

use unicode_segmentation::UnicodeSegmentation;

/// A chunk's position within the extracted text, as half open intervals in
/// both characters and bytes. Byte offsets always fall on character
/// boundaries, so slicing the source text with them cannot panic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    pub char_start: usize,
    pub char_end: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

impl ChunkSpan {
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// Splits text into overlapping windows of at most `chunk_size` characters.
/// Cuts prefer sentence boundaries, then word boundaries, and fall back to a
/// hard cut for unbroken runs. Adjacent chunks share up to `overlap`
/// characters so sentences near a cut stay queryable from either side.
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(chunk_size > 0, "chunk_size must be positive");
        debug_assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");
        Self { chunk_size, overlap }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into spans. The spans cover the text completely and in
    /// order; only the empty string produces no spans. The same input always
    /// yields the same spans.
    pub fn chunk(&self, text: &str) -> Vec<ChunkSpan> {
        if text.is_empty() {
            return Vec::new();
        }

        let char_pos: Vec<usize> = text.char_indices().map(|(byte, _)| byte).collect();
        let total_chars = char_pos.len();
        let byte_at = |char_idx: usize| {
            if char_idx == total_chars {
                text.len()
            } else {
                char_pos[char_idx]
            }
        };

        let sentence_starts = sentence_starts(text, &char_pos);
        let word_starts = word_starts(text);

        let mut spans = Vec::new();
        let mut start = 0;
        loop {
            let hard_end = (start + self.chunk_size).min(total_chars);
            let end = if hard_end == total_chars {
                total_chars
            } else {
                self.snap_cut(start, hard_end, &sentence_starts, &word_starts)
            };

            spans.push(ChunkSpan {
                char_start: start,
                char_end: end,
                byte_start: byte_at(start),
                byte_end: byte_at(end),
            });

            if end == total_chars {
                break;
            }

            let mut next = end.saturating_sub(self.overlap);
            if let Some(boundary) = nearest_boundary(next, end, &sentence_starts, &word_starts) {
                next = boundary;
            }
            // Forward progress: a window that cannot advance is emitted once.
            if next <= start {
                next = end;
            }
            start = next;
        }
        spans
    }

    /// Pick where the chunk starting at `start` ends. Prefers the last
    /// sentence boundary inside the window, then the last word boundary,
    /// never shrinking the chunk below half the configured size.
    fn snap_cut(
        &self,
        start: usize,
        hard_end: usize,
        sentence_starts: &[usize],
        word_starts: &[usize],
    ) -> usize {
        let floor = start + self.chunk_size / 2;
        if let Some(cut) = last_in_range(sentence_starts, floor + 1, hard_end) {
            return cut;
        }
        if let Some(cut) = last_in_range(word_starts, floor + 1, hard_end) {
            return cut;
        }
        hard_end
    }
}

/// Character indices where sentences begin, per Unicode sentence
/// segmentation.
fn sentence_starts(text: &str, char_pos: &[usize]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut byte = 0;
    for segment in text.split_sentence_bounds() {
        if let Ok(char_idx) = char_pos.binary_search(&byte) {
            starts.push(char_idx);
        }
        byte += segment.len();
    }
    starts
}

/// Character indices where a word begins: a non whitespace character at the
/// start of the text or right after whitespace.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut prev_was_space = true;
    for (char_idx, ch) in text.chars().enumerate() {
        if !ch.is_whitespace() && prev_was_space {
            starts.push(char_idx);
        }
        prev_was_space = ch.is_whitespace();
    }
    starts
}

/// Largest position in `[lo, hi]`, if any. `positions` is sorted ascending.
fn last_in_range(positions: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let idx = positions.partition_point(|&p| p <= hi);
    if idx == 0 {
        return None;
    }
    let candidate = positions[idx - 1];
    (candidate >= lo).then_some(candidate)
}

/// Smallest position in `[lo, hi]`, if any.
fn first_in_range(positions: &[usize], lo: usize, hi: usize) -> Option<usize> {
    let idx = positions.partition_point(|&p| p < lo);
    positions.get(idx).copied().filter(|&p| p <= hi)
}

/// Closest sentence or word boundary at or after `lo`, capped at `hi`.
fn nearest_boundary(
    lo: usize,
    hi: usize,
    sentence_starts: &[usize],
    word_starts: &[usize],
) -> Option<usize> {
    match (
        first_in_range(sentence_starts, lo, hi),
        first_in_range(word_starts, lo, hi),
    ) {
        (Some(s), Some(w)) => Some(s.min(w)),
        (Some(s), None) => Some(s),
        (None, Some(w)) => Some(w),
        (None, None) => None,
    }
}
