//! Sentence-aware text chunking measured in grapheme clusters

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::types::DocumentChunk;

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in graphemes
    chunk_size: usize,
    /// Graphemes carried over from the previous chunk
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` is capped below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create from the chunking section of the config
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.overlap())
    }

    /// Chunk a document into index-ready chunks without embeddings
    pub fn chunk_document(
        &self,
        doc_id: Uuid,
        text: &str,
        metadata: &HashMap<String, String>,
    ) -> Vec<DocumentChunk> {
        self.chunk_text(text)
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                DocumentChunk::new(doc_id, index as u32, chunk).with_metadata(metadata.clone())
            })
            .collect()
    }

    /// Split text into trimmed, non-empty chunks
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;
        // Whether `current` holds anything beyond carried-over overlap
        let mut has_new = false;

        for piece in self.pieces(text) {
            let piece_len = piece.graphemes(true).count();

            if current_len + piece_len > self.chunk_size {
                if has_new {
                    push_chunk(&mut chunks, &current);
                    current = self.get_overlap_text(&current);
                }

                let room = self.chunk_size - piece_len;
                current = tail_graphemes(&current, room).to_string();
                current_len = current.graphemes(true).count();
                has_new = false;
            }

            current.push_str(piece);
            current_len += piece_len;
            has_new |= !piece.trim().is_empty();
        }

        if has_new {
            push_chunk(&mut chunks, &current);
        }

        chunks
    }

    /// Sentences, with any sentence longer than the target hard-split
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if sentence.graphemes(true).count() <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }

            let mut start = 0usize;
            let mut count = 0usize;
            for (offset, _) in sentence.grapheme_indices(true) {
                if count == self.chunk_size {
                    pieces.push(&sentence[start..offset]);
                    start = offset;
                    count = 0;
                }
                count += 1;
            }
            if start < sentence.len() {
                pieces.push(&sentence[start..]);
            }
        }
        pieces
    }

    /// Get overlap text from the end of a chunk, starting at a word boundary if possible
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }

        let overlap_text = tail_graphemes(text, self.overlap);
        if overlap_text.len() == text.len() {
            return text.trim_start().to_string();
        }

        // Drop the partial word at the front
        if let Some(pos) = overlap_text.find(char::is_whitespace) {
            let rest = overlap_text[pos..].trim_start();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }

        overlap_text.to_string()
    }
}

/// The last `n` grapheme clusters of `text`
fn tail_graphemes(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.grapheme_indices(true).rev().nth(n - 1) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}

fn push_chunk(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grapheme_len(text: &str) -> usize {
        text.graphemes(true).count()
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(100, 20);
        let chunks = chunker.chunk_text("The clinic closes at 5pm on weekdays.");
        assert_eq!(chunks, vec!["The clinic closes at 5pm on weekdays."]);
    }

    #[test]
    fn test_whitespace_only_yields_nothing() {
        let chunker = TextChunker::new(10, 2);
        assert!(chunker.chunk_text("   \n\t  ").is_empty());
        assert!(chunker.chunk_text("").is_empty());
    }

    #[test]
    fn test_sentences_packed_with_overlap() {
        let chunker = TextChunker::new(40, 10);
        let text = "Triage opens at seven. Radiology opens at nine. Pharmacy closes at six.";
        let chunks = chunker.chunk_text(text);

        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| grapheme_len(c) <= 40));
        assert!(chunks[0].starts_with("Triage"));
        // Second chunk starts with words carried over from the first
        let first_words: Vec<&str> = chunks[0].split_whitespace().collect();
        let carried = chunks[1].split_whitespace().next().unwrap();
        assert!(first_words.contains(&carried));
    }

    #[test]
    fn test_long_sentence_hard_split() {
        let chunker = TextChunker::new(8, 0);
        let chunks = chunker.chunk_text("abcdefghijklmnopqrstu");
        assert_eq!(chunks, vec!["abcdefgh", "ijklmnop", "qrstu"]);
    }

    #[test]
    fn test_grapheme_clusters_not_split() {
        // "e" + combining acute is one grapheme
        let text = "e\u{301}".repeat(10);
        let chunker = TextChunker::new(3, 0);
        let chunks = chunker.chunk_text(&text);

        assert_eq!(chunks.len(), 4);
        for chunk in &chunks {
            assert!(!chunk.starts_with('\u{301}'));
            assert!(grapheme_len(chunk) <= 3);
        }
    }

    #[test]
    fn test_chunk_document_assigns_indices_and_metadata() {
        let chunker = TextChunker::new(20, 0);
        let doc_id = Uuid::new_v4();
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), "policy".to_string());

        let chunks = chunker.chunk_document(doc_id, "One two three. Four five six. Seven eight.", &metadata);
        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.doc_id, doc_id);
            assert_eq!(chunk.metadata, metadata);
            assert!(chunk.embedding.is_empty());
        }
    }

    #[test]
    fn test_from_config() {
        let config = ChunkingConfig {
            chunk_size: 400,
            overlap_ratio: 0.25,
        };
        let chunker = TextChunker::from_config(&config);
        assert_eq!(chunker.chunk_size, 400);
        assert_eq!(chunker.overlap, 100);
    }

    fn document() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop::sample::select(vec![
                "the", "clinic", "café", "e\u{301}te", "closes.", "Wait!", "\n", "a",
                "supercalifragilistic", "😀",
            ]),
            0..80,
        )
        .prop_map(|words| words.join(" "))
    }

    proptest! {
        #[test]
        fn prop_chunks_bounded_and_non_empty(
            text in document(),
            size in 4usize..60,
            ratio in 0.0f32..0.9,
        ) {
            let chunker = TextChunker::new(size, (size as f32 * ratio).floor() as usize);
            for chunk in chunker.chunk_text(&text) {
                prop_assert!(!chunk.trim().is_empty());
                prop_assert!(grapheme_len(&chunk) <= size);
            }
        }

        #[test]
        fn prop_no_overlap_preserves_content(text in document(), size in 4usize..60) {
            let chunker = TextChunker::new(size, 0);
            let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            let joined: String = chunker.chunk_text(&text).iter().map(|c| strip(c)).collect();
            prop_assert_eq!(joined, strip(&text));
        }
    }
}
