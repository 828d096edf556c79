//! Sliding-window text chunker with sentence-boundary snapping.
//!
//! Walks the text in windows of `chunk_size` characters. A window that does
//! not reach the end of the text is shortened to end just after the last
//! `.` or `\n` it contains, but only when that boundary lies past the
//! window's midpoint; otherwise the raw edge is kept so a distant boundary
//! never produces a sliver of a chunk. Consecutive windows share `overlap`
//! characters, except after the final window.
//!
//! Positions are counted in Unicode scalar values, so multi-byte text is
//! never split inside a character.

use std::ops::Range;

/// Character spans of every window, in order.
///
/// The spans cover `0..char_count` with consecutive spans overlapping by at
/// most `overlap` characters. Always terminates: a window that would not
/// advance (overlap at least as large as the window) moves forward by one
/// character instead.
pub fn chunk_spans(text: &str, chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    spans_over(&chars, chunk_size, overlap)
}

/// Split text into trimmed, non-empty chunks.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    spans_over(&chars, chunk_size, overlap)
        .into_iter()
        .filter_map(|span| {
            let piece: String = chars[span].iter().collect();
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn spans_over(chars: &[char], chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    let size = chunk_size.max(1);
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = (start + size).min(len);

        if end < len {
            let boundary = chars[start..end]
                .iter()
                .rposition(|&c| c == '.' || c == '\n');
            if let Some(offset) = boundary {
                if offset > size / 2 {
                    end = start + offset + 1;
                }
            }
        }

        spans.push(start..end);

        start = if end < len {
            end.saturating_sub(overlap).max(start + 1)
        } else {
            end
        };
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} talks about topic {}.", i, i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = chunk_text("Hello, world. Second sentence.", 1000, 200);
        assert_eq!(chunks, vec!["Hello, world. Second sentence.".to_string()]);
    }

    #[test]
    fn text_of_exactly_chunk_size_is_single_chunk() {
        let text = "a".repeat(50);
        let spans = chunk_spans(&text, 50, 10);
        assert_eq!(spans, vec![0..50]);
    }

    #[test]
    fn empty_and_blank_text_yield_nothing() {
        assert!(chunk_text("", 1000, 200).is_empty());
        assert!(chunk_text("   \n\t  ", 1000, 200).is_empty());
    }

    #[test]
    fn no_boundary_falls_back_to_raw_cut() {
        let text = "x".repeat(250);
        let spans = chunk_spans(&text, 100, 20);
        assert_eq!(spans, vec![0..100, 80..180, 160..250]);
    }

    #[test]
    fn snaps_to_period_past_midpoint() {
        // Period at index 69 (> 50), window 0..100.
        let mut text = "a".repeat(69);
        text.push('.');
        text.push_str(&"b".repeat(100));
        let spans = chunk_spans(&text, 100, 10);
        assert_eq!(spans[0], 0..70);
        assert_eq!(spans[1].start, 60);
        let chunks = chunk_text(&text, 100, 10);
        assert!(chunks[0].ends_with('.'));
    }

    #[test]
    fn ignores_boundary_before_midpoint() {
        // Period at index 10 (< 50): keep the raw window edge.
        let mut text = "a".repeat(10);
        text.push('.');
        text.push_str(&"b".repeat(200));
        let spans = chunk_spans(&text, 100, 10);
        assert_eq!(spans[0], 0..100);
    }

    #[test]
    fn snaps_to_newline() {
        let mut text = "a".repeat(80);
        text.push('\n');
        text.push_str(&"b".repeat(100));
        let spans = chunk_spans(&text, 100, 10);
        assert_eq!(spans[0], 0..81);
    }

    #[test]
    fn overlap_not_smaller_than_size_terminates() {
        let text = "y".repeat(40);
        let spans = chunk_spans(&text, 10, 10);
        assert!(!spans.is_empty());
        assert_eq!(spans.last().unwrap().end, 40);
        for pair in spans.windows(2) {
            assert!(pair[1].start > pair[0].start);
        }

        let spans = chunk_spans(&text, 10, 25);
        assert_eq!(spans.last().unwrap().end, 40);
    }

    #[test]
    fn zero_chunk_size_terminates() {
        let spans = chunk_spans("abc", 0, 0);
        assert_eq!(spans, vec![0..1, 1..2, 2..3]);
    }

    #[test]
    fn spans_cover_text_with_bounded_overlap() {
        for (size, overlap) in [(1000, 200), (100, 20), (64, 0), (37, 11)] {
            let text = sample_text(120);
            let len = text.chars().count();
            let spans = chunk_spans(&text, size, overlap);

            assert_eq!(spans.first().unwrap().start, 0);
            assert_eq!(spans.last().unwrap().end, len);
            for pair in spans.windows(2) {
                // No gap, and the shared region never exceeds the overlap.
                assert!(pair[1].start <= pair[0].end);
                assert!(pair[0].end - pair[1].start <= overlap);
                assert!(pair[1].start > pair[0].start);
            }
            for span in &spans {
                assert!(span.end - span.start <= size);
            }
        }
    }

    #[test]
    fn chunks_are_trimmed_and_non_empty() {
        let text = format!("{}\n\n   \n{}", sample_text(30), sample_text(30));
        for chunk in chunk_text(&text, 120, 30) {
            assert!(!chunk.is_empty());
            assert_eq!(chunk, chunk.trim());
        }
    }

    #[test]
    fn deterministic() {
        let text = sample_text(200);
        let a = chunk_text(&text, 300, 50);
        let b = chunk_text(&text, 300, 50);
        assert_eq!(a, b);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let text = "héllo wörld ñandú. ".repeat(40);
        let chunks = chunk_text(&text, 50, 10);
        assert!(chunks.len() > 1);
        let spans = chunk_spans(&text, 50, 10);
        assert_eq!(spans.last().unwrap().end, text.chars().count());
    }
}
