//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping windows of `chunk_size` characters.
///
/// Sizes are counted in chars, not bytes, so multi-byte scripts get the
/// same window length as ASCII. The final window ends at the end of the
/// text; no trailing fragment is dropped.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chunk_size = chunk_size.max(1);
    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    // Byte offset of every char, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(char_count);
        let (start_byte, end_byte) = (bounds[start], bounds[end]);
        let piece = text[start_byte..end_byte].trim();

        if !piece.is_empty() {
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: piece.to_string(),
                metadata: serde_json::json!({
                    "start": start_byte,
                    "end": end_byte,
                }),
            });
            position += 1;
        }

        if end == char_count {
            break;
        }
        start += step;
    }

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("test-source", &text, 200, 50);

        assert_eq!(chunks.len(), 7);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].metadata["start"], 150);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("test-source", &text, 100, 0);

        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_chunk_text_short_text_is_one_chunk() {
        let chunks = chunk_text("s", "  short note  ", 512, 50);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "short note");
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("test-source", "", 100, 10).is_empty());
        assert!(chunk_text("test-source", " \n ", 100, 10).is_empty());
    }

    #[test]
    fn test_chunk_text_keeps_tail() {
        let text = format!("{}END", "x".repeat(100));
        let chunks = chunk_text("s", &text, 50, 0);
        assert!(chunks.last().unwrap().text.ends_with("END"));
    }

    #[test]
    fn test_chunk_text_counts_chars_not_bytes() {
        let text = "高血压是一种常见的慢性病".repeat(10);
        let chunks = chunk_text("s", &text, 20, 5);

        for chunk in &chunks[..chunks.len() - 1] {
            assert_eq!(chunk.text.chars().count(), 20);
        }
        let first_tail: String = chunks[0].text.chars().skip(15).collect();
        assert!(chunks[1].text.starts_with(&first_tail));
    }

    #[test]
    fn test_overlap_larger_than_size_still_advances() {
        let text = "b".repeat(30);
        let chunks = chunk_text("s", &text, 10, 20);
        assert_eq!(chunks.len(), 3);
    }
}
