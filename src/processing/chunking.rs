//! Recursive separator-based chunking with character overlap.
//!
//! Text is split on the coarsest separator that appears in it (paragraph,
//! line, word), recursing to finer separators for any piece that still
//! exceeds the chunk size, and finally to a per-character hard cut. The
//! resulting pieces are merged back into windows of at most `chunk_size`
//! characters; adjacent windows share up to `chunk_overlap` characters of
//! trailing context. Lengths are measured in characters, not bytes.

use std::collections::VecDeque;
use thiserror::Error;

/// Separators tried from coarsest to finest; the empty string means a
/// per-character split.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Errors produced while configuring the chunker.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunk size of zero can never hold any text.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for fresh content in every chunk.
    #[error("chunk overlap ({overlap}) must be smaller than chunk size ({size})")]
    OverlapTooLarge {
        /// Configured overlap in characters.
        overlap: usize,
        /// Configured chunk size in characters.
        size: usize,
    },
}

/// Splits text into bounded, overlapping windows.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    /// Build a chunker, validating the size/overlap relationship up front.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, ChunkingError> {
        if chunk_size == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        if chunk_overlap >= chunk_size {
            return Err(ChunkingError::OverlapTooLarge {
                overlap: chunk_overlap,
                size: chunk_size,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Split `text` into chunks of at most `chunk_size` characters.
    ///
    /// Empty and whitespace-only input produce no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split(text, &SEPARATORS)
    }

    fn split(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (separator, finer) = pick_separator(text, separators);
        let pieces = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut fitting: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                fitting.push(piece);
            } else {
                if !fitting.is_empty() {
                    self.merge(&fitting, &mut chunks);
                    fitting.clear();
                }
                // An oversized piece is re-split with the finer separators.
                chunks.extend(self.split(piece, finer));
            }
        }
        if !fitting.is_empty() {
            self.merge(&fitting, &mut chunks);
        }
        chunks
    }

    /// Merge fitting pieces into windows, carrying trailing pieces forward so
    /// adjacent windows overlap by up to `chunk_overlap` characters.
    fn merge(&self, pieces: &[&str], out: &mut Vec<String>) {
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_window(&window, out);
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    let dropped = window
                        .pop_front()
                        .expect("window is non-empty while total is positive");
                    total -= char_len(dropped);
                }
            }
            window.push_back(piece);
            total += len;
        }

        push_window(&window, out);
    }
}

fn pick_separator<'a>(text: &str, separators: &'a [&'a str]) -> (&'a str, &'a [&'a str]) {
    for (position, separator) in separators.iter().enumerate() {
        if separator.is_empty() || text.contains(separator) {
            return (separator, &separators[position + 1..]);
        }
    }
    ("", &[])
}

/// Split on a separator, keeping each separator attached to the start of the
/// following piece so no characters are lost when pieces are rejoined.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(index, character)| &text[index..index + character.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    let mut search_from = 0;
    while let Some(position) = text[search_from..].find(separator) {
        let boundary = search_from + position;
        if boundary > start {
            pieces.push(&text[start..boundary]);
            start = boundary;
        }
        search_from = boundary + separator.len();
    }
    pieces.push(&text[start..]);
    pieces
}

fn push_window(window: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_chunk_size() {
        assert!(matches!(
            Chunker::new(0, 0),
            Err(ChunkingError::InvalidChunkSize)
        ));
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(
            Chunker::new(10, 10),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
        assert!(matches!(
            Chunker::new(10, 15),
            Err(ChunkingError::OverlapTooLarge { .. })
        ));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n  ").is_empty());
    }

    #[test]
    fn short_input_yields_single_chunk() {
        let chunker = Chunker::new(100, 20).unwrap();
        assert_eq!(chunker.chunk("Hello world"), vec!["Hello world"]);
    }

    #[test]
    fn every_chunk_respects_the_size_bound() {
        let chunker = Chunker::new(20, 5).unwrap();
        let text = "The quick brown fox jumps over the lazy dog.\n\n\
                    Pack my box with five dozen liquor jugs.\n\
                    How vexingly quick daft zebras jump!";
        for chunk in chunker.chunk(text) {
            assert!(
                chunk.chars().count() <= 20,
                "chunk too long: {chunk:?}"
            );
        }
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let chunker = Chunker::new(30, 0).unwrap();
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = chunker.chunk(text);
        assert_eq!(
            chunks,
            vec!["First paragraph here.", "Second paragraph here."]
        );
    }

    #[test]
    fn hard_cut_produces_exact_character_overlap() {
        let chunker = Chunker::new(10, 3).unwrap();
        // No separators at all, so every split is a single character.
        let text = "abcdefghijklmnopqrstuvwxyz0123456789";
        let chunks = chunker.chunk(text);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 10);
        }
        for pair in chunks.windows(2) {
            let tail: String = pair[0]
                .chars()
                .rev()
                .take(3)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            let head: String = pair[1].chars().take(3).collect();
            assert_eq!(tail, head, "adjacent chunks must share overlap");
        }
    }

    #[test]
    fn hard_cut_covers_all_characters_in_order() {
        let chunker = Chunker::new(8, 2).unwrap();
        let text = "abcdefghijklmnop";
        let chunks = chunker.chunk(text);

        // Strip the two-character overlap from every chunk after the first
        // and the original text must reassemble exactly.
        let mut reassembled = chunks[0].clone();
        for chunk in &chunks[1..] {
            reassembled.extend(chunk.chars().skip(2));
        }
        assert_eq!(reassembled, text);
    }

    #[test]
    fn multibyte_text_is_split_on_character_boundaries() {
        let chunker = Chunker::new(4, 1).unwrap();
        let text = "héllo wörld ünïcode";
        for chunk in chunker.chunk(text) {
            assert!(chunk.chars().count() <= 4, "chunk too long: {chunk:?}");
        }
    }

    #[test]
    fn defaults_match_thousand_by_two_hundred() {
        let chunker = Chunker::new(1000, 200).unwrap();
        let paragraph = "word ".repeat(400);
        let chunks = chunker.chunk(&paragraph);
        assert!(chunks.len() > 1);
        for chunk in chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }
}
