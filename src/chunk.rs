//! Sliding-window text chunker.
//!
//! Splits document content into overlapping [`Chunk`]s of at most
//! `window_size` characters. Each window starts `overlap` characters
//! before the previous window's end, so consecutive chunks share
//! `overlap` characters of context.
//!
//! Offsets are counted in `char`s, not bytes, so multi-byte text never
//! gets cut inside a code point.
//!
//! Each chunk receives a deterministic UUID derived from its document ID
//! and index, so reprocessing the same document yields the same chunk IDs.
//!
//! # Algorithm
//!
//! 1. Start at offset 0.
//! 2. Cut `[start, min(start + window_size, len))` and emit it.
//! 3. If the window reached the end of the text, stop.
//! 4. Otherwise continue from `end - overlap`.
//!
//! # Example
//!
//! ```rust
//! use docqa::chunk::chunk_text;
//!
//! let chunks = chunk_text("doc-123", "hello", 1000, 200).unwrap();
//! assert_eq!(chunks.len(), 1);
//! assert_eq!((chunks[0].start, chunks[0].end), (0, 5));
//! ```

use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::error::QaError;
use crate::models::Chunk;

/// Split text into overlapping character windows.
///
/// # Guarantees
///
/// - Empty text yields no chunks.
/// - Chunk indices are contiguous: `0, 1, 2, …, N-1`.
/// - The ranges `[start, end)` cover `[0, len)` without gaps and the last
///   chunk ends at `len`.
/// - `next.start == prev.end - overlap` for every consecutive pair.
///
/// # Errors
///
/// Returns [`QaError::InvalidInput`] when `window_size` is zero or
/// `overlap >= window_size`, since the window would never advance.
pub fn chunk_text(
    document_id: &str,
    text: &str,
    window_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, QaError> {
    if window_size == 0 {
        return Err(QaError::InvalidInput(
            "window_size must be greater than 0".to_string(),
        ));
    }
    if overlap >= window_size {
        return Err(QaError::InvalidInput(format!(
            "overlap ({}) must be less than window_size ({})",
            overlap, window_size
        )));
    }

    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let length = boundaries.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < length {
        let end = (start + window_size).min(length);
        let content = &text[boundaries[start]..boundaries[end]];
        chunks.push(make_chunk(document_id, chunks.len() as i64, content, start, end));

        if end == length {
            break;
        }
        start = end - overlap;
    }

    Ok(chunks)
}

/// [`chunk_text`] with parameters taken from `[chunking]`.
pub fn chunk_with_config(
    document_id: &str,
    text: &str,
    config: &ChunkingConfig,
) -> Result<Vec<Chunk>, QaError> {
    chunk_text(document_id, text, config.window_size, config.overlap)
}

/// Deterministic chunk ID for a document position.
pub fn chunk_id(document_id: &str, index: i64) -> String {
    let name = format!("{}:{}", document_id, index);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

fn make_chunk(document_id: &str, index: i64, content: &str, start: usize, end: usize) -> Chunk {
    Chunk {
        id: chunk_id(document_id, index),
        document_id: document_id.to_string(),
        index,
        content: content.to_string(),
        start,
        end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_text(len: usize) -> String {
        "abcdefghij".chars().cycle().take(len).collect()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("doc1", "hello", 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "hello");
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[0].end, 5);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn test_empty_text() {
        let chunks = chunk_text("doc1", "", 1000, 200).unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_exact_window_length_single_chunk() {
        let text = sample_text(1000);
        let chunks = chunk_text("doc1", &text, 1000, 200).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].end, 1000);
    }

    #[test]
    fn test_windows_for_default_config() {
        let text = sample_text(2500);
        let chunks = chunk_text("doc1", &text, 1000, 200).unwrap();
        let ranges: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(ranges, vec![(0, 1000), (800, 1800), (1600, 2500)]);
    }

    #[test]
    fn test_no_trailing_duplicate_when_window_hits_end() {
        let text = sample_text(1800);
        let chunks = chunk_text("doc1", &text, 1000, 200).unwrap();
        let ranges: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start, c.end)).collect();
        assert_eq!(ranges, vec![(0, 1000), (800, 1800)]);
    }

    #[test]
    fn test_coverage_and_overlap_properties() {
        for &(len, window, overlap) in &[
            (1usize, 1usize, 0usize),
            (17, 5, 2),
            (100, 10, 9),
            (999, 100, 0),
            (1234, 1000, 200),
            (5000, 333, 111),
        ] {
            let text = sample_text(len);
            let chunks = chunk_text("doc1", &text, window, overlap).unwrap();

            assert_eq!(chunks[0].start, 0);
            assert_eq!(chunks.last().unwrap().end, len);

            for c in &chunks {
                assert!(c.start < c.end && c.end <= len);
                assert!(c.end - c.start <= window);
                assert_eq!(c.content, text[c.start..c.end]);
            }

            for pair in chunks.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                assert_eq!(next.start, prev.end - overlap, "len={} window={}", len, window);
                assert!(next.start > prev.start);
                assert_eq!(prev.end - prev.start, window);
            }

            for (i, c) in chunks.iter().enumerate() {
                assert_eq!(c.index, i as i64);
            }
        }
    }

    #[test]
    fn test_offsets_are_characters_not_bytes() {
        let text = "┌──┐ héllo wörld ✓";
        let char_len = text.chars().count();
        let chunks = chunk_text("doc1", text, 6, 2).unwrap();
        assert_eq!(chunks.last().unwrap().end, char_len);
        for c in &chunks {
            let expected: String = text.chars().skip(c.start).take(c.end - c.start).collect();
            assert_eq!(c.content, expected);
        }
    }

    #[test]
    fn test_rejects_overlap_at_or_above_window() {
        assert!(matches!(
            chunk_text("doc1", "text", 10, 10),
            Err(QaError::InvalidInput(_))
        ));
        assert!(matches!(
            chunk_text("doc1", "text", 10, 20),
            Err(QaError::InvalidInput(_))
        ));
        assert!(matches!(
            chunk_text("doc1", "text", 0, 0),
            Err(QaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deterministic_ids() {
        let text = sample_text(3000);
        let c1 = chunk_text("doc1", &text, 1000, 200).unwrap();
        let c2 = chunk_text("doc1", &text, 1000, 200).unwrap();
        assert_eq!(c1, c2);
        assert_ne!(c1[0].id, c1[1].id);
        assert_ne!(chunk_id("doc1", 0), chunk_id("doc2", 0));
    }
}
