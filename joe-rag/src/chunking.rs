//! Sentence-aware document chunking.
//!
//! Text is cut into windows of `chunk_size` characters that overlap by
//! `overlap` characters. When a window ends before the end of the text, the
//! cut is moved to the first sentence terminator (`.`, `!`, `?`) followed by
//! whitespace found within [`BOUNDARY_SEARCH_RADIUS`] characters of the
//! proposed end, so chunks preferentially end on a sentence.
//!
//! All offsets are measured in characters, never bytes.

use std::ops::Range;

use crate::document::{ChunkMetadata, Document, DocumentChunk};
use crate::error::{RagError, Result};

/// Default chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// How far either side of a proposed cut the sentence search looks.
pub const BOUNDARY_SEARCH_RADIUS: usize = 100;

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<DocumentChunk>;
}

/// Splits documents with [`chunk_text`] and tags each chunk with its source.
///
/// Chunk ids are `<document-id>-chunk-<index>` and every chunk gets the
/// section label `Chunk <index + 1>`.
///
/// # Example
///
/// ```rust,ignore
/// use joe_rag::{Chunker, Document, SentenceChunker};
///
/// let chunker = SentenceChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&Document::new("doc-1", "mill.txt", text));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SentenceChunker {
    chunk_size: usize,
    overlap: usize,
}

impl SentenceChunker {
    /// Create a chunker, validating the window parameters.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
    /// `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        validate(chunk_size, overlap)?;
        Ok(Self { chunk_size, overlap })
    }

    /// The configured chunk size in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// The configured overlap in characters.
    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for SentenceChunker {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl Chunker for SentenceChunker {
    fn chunk(&self, document: &Document) -> Vec<DocumentChunk> {
        let offsets = char_offsets(&document.text);
        spans(&document.text, &offsets, self.chunk_size, self.overlap)
            .into_iter()
            .enumerate()
            .map(|(index, span)| DocumentChunk {
                id: DocumentChunk::chunk_id(&document.id, index),
                text: document.text[offsets[span.start]..offsets[span.end]].to_string(),
                metadata: ChunkMetadata::from_source(&document.source)
                    .with_section(format!("Chunk {}", index + 1)),
            })
            .collect()
    }
}

/// Split `text` into overlapping, sentence-aligned chunks.
///
/// # Errors
///
/// Returns [`RagError::ChunkingError`] if `chunk_size` is zero or
/// `overlap >= chunk_size`.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    validate(chunk_size, overlap)?;
    let offsets = char_offsets(text);
    Ok(spans(text, &offsets, chunk_size, overlap)
        .into_iter()
        .map(|span| text[offsets[span.start]..offsets[span.end]].to_string())
        .collect())
}

/// The character ranges [`chunk_text`] would cut `text` into.
///
/// # Errors
///
/// Same as [`chunk_text`].
pub fn chunk_spans(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Range<usize>>> {
    validate(chunk_size, overlap)?;
    Ok(spans(text, &char_offsets(text), chunk_size, overlap))
}

fn validate(chunk_size: usize, overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::ChunkingError("chunk_size must be greater than zero".to_string()));
    }
    if overlap >= chunk_size {
        return Err(RagError::ChunkingError(format!(
            "overlap ({overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Byte offset of every character, plus the text length as a sentinel.
fn char_offsets(text: &str) -> Vec<usize> {
    text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect()
}

fn spans(text: &str, offsets: &[usize], chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    debug_assert_eq!(offsets.len(), len + 1);

    let mut spans = Vec::new();
    let mut start = 0;

    while start < len {
        let mut end = start + chunk_size;
        if end < len {
            if let Some(cut) = sentence_cut(&chars, end) {
                if cut > start {
                    end = cut;
                }
            }
        }
        spans.push(start..end.min(len));

        // The overlap is measured from the proposed end, which may lie past
        // the text. A step that would not move forward skips it instead.
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    spans
}

/// Position just past the first `[.!?]\s` inside the search window around
/// `proposed`, ignoring a match at the very start of the window.
fn sentence_cut(chars: &[char], proposed: usize) -> Option<usize> {
    let window_start = proposed.saturating_sub(BOUNDARY_SEARCH_RADIUS);
    let window_end = (proposed + BOUNDARY_SEARCH_RADIUS).min(chars.len());
    if window_end < window_start + 2 {
        return None;
    }

    chars[window_start..window_end]
        .windows(2)
        .position(|pair| matches!(pair[0], '.' | '!' | '?') && pair[1].is_whitespace())
        .filter(|&found| found > 0)
        .map(|found| window_start + found + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 1000, 200).unwrap().is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let text = "Hot rolled coil ships Tuesday.";
        assert_eq!(chunk_text(text, 1000, 200).unwrap(), vec![text.to_string()]);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(chunk_text("abc", 10, 10), Err(RagError::ChunkingError(_))));
        assert!(matches!(chunk_text("abc", 10, 20), Err(RagError::ChunkingError(_))));
        assert!(matches!(chunk_text("abc", 0, 0), Err(RagError::ChunkingError(_))));
    }

    #[test]
    fn unpunctuated_text_uses_fixed_windows() {
        let text = "a".repeat(2500);
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans, vec![0..1000, 800..1800, 1600..2500, 2400..2500]);
    }

    #[test]
    fn window_past_the_end_needs_no_trailing_chunk() {
        let text = "a".repeat(1950);
        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans, vec![0..1000, 800..1800, 1600..1950]);
    }

    #[test]
    fn cut_moves_to_sentence_boundary() {
        // Sentence ends at char 949 (the '.'), followed by a space at 950.
        let mut text = "x".repeat(949);
        text.push_str(". ");
        text.push_str(&"y".repeat(600));

        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans[0], 0..951);
        assert!(text.chars().take(951).collect::<String>().ends_with(". "));
        assert_eq!(spans[1].start, 751);
    }

    #[test]
    fn terminator_at_window_start_is_ignored() {
        // The only boundary sits exactly at the window start (char 900).
        let mut text = "x".repeat(900);
        text.push_str(". ");
        text.push_str(&"y".repeat(400));

        let spans = chunk_spans(&text, 1000, 200).unwrap();
        assert_eq!(spans[0], 0..1000);
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let text = "é".repeat(30);
        let chunks = chunk_text(&text, 10, 3).unwrap();
        assert!(chunks.iter().all(|c| c.chars().all(|ch| ch == 'é')));
        assert_eq!(chunks[0].chars().count(), 10);
    }

    #[test]
    fn small_windows_always_terminate() {
        // A boundary pulled far back would otherwise step backwards.
        let text = "Ok. ".repeat(100);
        let spans = chunk_spans(&text, 150, 140).unwrap();
        assert!(spans.windows(2).all(|w| w[1].start > w[0].start));
        assert_eq!(spans.last().map(|s| s.end), Some(text.chars().count()));
    }

    #[test]
    fn chunker_tags_ids_and_sections() {
        let chunker = SentenceChunker::new(10, 2).unwrap();
        let chunks = chunker.chunk(&Document::new("doc-7", "specs.txt", "abcdefghijklmnop"));

        assert_eq!(chunks[0].id, "doc-7-chunk-0");
        assert_eq!(chunks[1].id, "doc-7-chunk-1");
        assert_eq!(chunks[0].metadata.source, "specs.txt");
        assert_eq!(chunks[1].metadata.section.as_deref(), Some("Chunk 2"));
        assert_eq!(chunks[0].text, "abcdefghij");
        assert_eq!(chunks[1].text, "ijklmnop");
    }
}
