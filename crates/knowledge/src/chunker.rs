//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping windows.
///
/// Sizes are counted in characters, so a window never splits a UTF-8
/// sequence. Each window after the first starts `chunk_size - overlap`
/// characters after the previous one. Chunking stops once a window reaches
/// the end of the text, and whitespace-only windows are skipped. Stored text
/// is trimmed and `char_start`/`char_end` describe the trimmed span.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() || chunk_size == 0 {
        return vec![];
    }

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0usize;

    loop {
        let end = (start + chunk_size).min(chars.len());
        let window: String = chars[start..end].iter().collect();
        let trimmed = window.trim();

        if !trimmed.is_empty() {
            // Offsets locate the stored (trimmed) text in the source
            let leading = window.chars().take_while(|c| c.is_whitespace()).count();
            let trailing = window.chars().rev().take_while(|c| c.is_whitespace()).count();
            chunks.push(ChunkCandidate {
                source_id: source_id.to_string(),
                position,
                text: trimmed.to_string(),
                metadata: serde_json::json!({
                    "char_start": start + leading,
                    "char_end": end - trailing,
                }),
            });
            position += 1;
        }

        if end >= chars.len() {
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

    fn offsets(chunk: &ChunkCandidate) -> (u64, u64) {
        (
            chunk.metadata["char_start"].as_u64().unwrap(),
            chunk.metadata["char_end"].as_u64().unwrap(),
        )
    }

    #[test]
    fn test_chunk_text_windows() {
        let text = "a".repeat(2500);
        let chunks = chunk_text("hr", &text, 1000, 200);

        let ranges: Vec<(u64, u64)> = chunks.iter().map(offsets).collect();
        assert_eq!(ranges, vec![(0, 1000), (800, 1800), (1600, 2500)]);
        assert_eq!(chunks[2].position, 2);
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("test-source", &text, 100, 0);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = chunk_text("finance", "Submit expenses within 30 days.", 1000, 200);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Submit expenses within 30 days.");
        assert_eq!(offsets(&chunks[0]), (0, 31));
    }

    #[test]
    fn test_no_window_inside_previous_overlap() {
        // 1000 chars: the first window already covers everything
        let text = "b".repeat(1000);
        let chunks = chunk_text("tech", &text, 1000, 200);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("test-source", "", 100, 10).is_empty());
        assert!(chunk_text("test-source", "   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn test_adjacent_windows_share_overlap() {
        let text: String = ('a'..='z').cycle().take(260).collect();
        let chunks = chunk_text("test-source", &text, 50, 10);

        let first_tail: String = chunks[0].text.chars().skip(40).collect();
        let second_head: String = chunks[1].text.chars().take(10).collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn test_offsets_match_trimmed_text() {
        let text = format!("{}\n\n  {}  \n{}", "x".repeat(40), "y".repeat(30), "z".repeat(40));
        let source: Vec<char> = text.chars().collect();
        let chunks = chunk_text("hr", &text, 50, 10);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            let (start, end) = offsets(chunk);
            let span: String = source[start as usize..end as usize].iter().collect();
            assert_eq!(span, chunk.text);
        }
        // Window 40..90 opens on whitespace
        assert_eq!(offsets(&chunks[1]).0, 44);
    }

    #[test]
    fn test_multibyte_characters_are_counted_once() {
        let text = "é".repeat(150);
        let chunks = chunk_text("test-source", &text, 100, 20);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text.chars().count(), 100);
        assert_eq!(offsets(&chunks[1]), (80, 150));
    }
}
