//! Recursive character splitting of reference text.
//!
//! Text is split on the coarsest separator that occurs (paragraph break, line
//! break, space, then single characters) and the pieces are greedily merged
//! back into windows of at most `chunk_size` characters. Consecutive windows
//! share up to `chunk_overlap` trailing characters so that a clause cut at a
//! boundary keeps some surrounding context.

use std::collections::VecDeque;

use crate::document::{ReferenceChunk, ReferenceUnit, CHUNK_KEY};

const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    /// `chunk_overlap` is clamped below `chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
        }
    }

    /// Split every unit, tagging each chunk with its unit's metadata and its
    /// position within the unit.
    pub fn split_units(&self, units: &[ReferenceUnit]) -> Vec<ReferenceChunk> {
        units
            .iter()
            .flat_map(|unit| {
                self.split_text(&unit.text)
                    .into_iter()
                    .enumerate()
                    .map(move |(i, text)| {
                        let mut metadata = unit.metadata.clone();
                        metadata.insert(CHUNK_KEY.to_string(), i.to_string());
                        ReferenceChunk { text, metadata }
                    })
            })
            .collect()
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, SEPARATORS)
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        // First separator present in the text; "" always matches
        let position = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep))
            .unwrap_or(separators.len().saturating_sub(1));
        let separator = separators.get(position).copied().unwrap_or("");
        let finer = separators.get(position + 1..).unwrap_or(&[]);

        let pieces: Vec<&str> = if separator.is_empty() {
            text.char_indices()
                .map(|(i, c)| &text[i..i + c.len_utf8()])
                .collect()
        } else {
            text.split(separator).filter(|p| !p.is_empty()).collect()
        };

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if finer.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, finer));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }

        chunks
    }

    /// Greedy merge of small pieces into windows with trailing overlap
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);
            let joined_len = |window: &VecDeque<&str>, total: usize| {
                total + len + if window.is_empty() { 0 } else { sep_len }
            };

            if joined_len(&window, total) > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window, separator);

                // Shrink from the front until the kept tail fits the overlap
                // and leaves room for the next piece
                while total > self.chunk_overlap
                    || (total > 0 && joined_len(&window, total) > self.chunk_size)
                {
                    let Some(front) = window.pop_front() else { break };
                    total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                }
            }

            total += len + if window.is_empty() { 0 } else { sep_len };
            window.push_back(piece);
        }

        push_trimmed(&mut chunks, &window, separator);
        chunks
    }
}

fn push_trimmed(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SOURCE_KEY;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        let splitter = RecursiveSplitter::new(1200, 150);
        assert_eq!(splitter.split_text("  A short clause.  "), vec!["A short clause."]);
        assert!(splitter.split_text("   \n\n ").is_empty());
    }

    #[test]
    fn test_paragraphs_are_kept_whole_when_they_fit() {
        let splitter = RecursiveSplitter::new(20, 0);
        let chunks = splitter.split_text("first para\n\nsecond para\n\nthird");
        assert_eq!(chunks, vec!["first para", "second para\n\nthird"]);
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let splitter = RecursiveSplitter::new(20, 8);
        let text = "one two three four five six seven eight nine ten";
        let chunks = splitter.split_text(text);

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].starts_with(last_word), "{:?}", pair);
        }
    }

    #[test]
    fn test_units_carry_metadata() {
        let splitter = RecursiveSplitter::new(10, 0);
        let unit = ReferenceUnit::new("alpha beta gamma".to_string(), "ref.pdf").with_page(3);
        let chunks = splitter.split_units(&[unit]);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].metadata[SOURCE_KEY], "ref.pdf");
        assert_eq!(chunks[1].metadata["page"], "3");
        assert_eq!(chunks[1].metadata[CHUNK_KEY], "1");
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let splitter = RecursiveSplitter::new(4, 1);
        let chunks = splitter.split_text("abcdefghij");
        assert!(chunks.iter().all(|c| c.chars().count() <= 4));
        assert_eq!(chunks.first().map(String::as_str), Some("abcd"));
    }

    proptest! {
        #[test]
        fn chunks_never_exceed_chunk_size(
            text in "[a-z \n]{0,400}",
            size in 5usize..60,
            overlap in 0usize..20,
        ) {
            let splitter = RecursiveSplitter::new(size, overlap);
            for chunk in splitter.split_text(&text) {
                prop_assert!(chunk.chars().count() <= size);
                prop_assert!(!chunk.trim().is_empty());
            }
        }

        #[test]
        fn every_word_survives_splitting(words in prop::collection::vec("[a-z]{1,8}", 0..60)) {
            let text = words.join(" ");
            let chunks = RecursiveSplitter::new(30, 5).split_text(&text);
            let joined = chunks.join(" ");
            for word in &words {
                prop_assert!(joined.contains(word.as_str()));
            }
        }
    }
}
