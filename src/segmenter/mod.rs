/// Line-oriented text segmentation.
///
/// Splits a document into overlapping chunks bounded by an approximate token
/// budget. Each chunk carries a human-readable reference that downstream
/// consumers cite verbatim, so the two reference shapes are fixed:
/// the bare path when a chunk covers the whole (filtered) input, otherwise
/// `"{path}, Lines {start} to {end}"`.
pub mod filters;

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub use filters::{FileFilters, FilterPatterns, LineFilter};

/// Errors raised while building a [`Segmenter`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SegmenterError {
    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("overlap ({overlap}) must be smaller than chunk size ({chunk_size})")]
    InvalidOverlap { overlap: usize, chunk_size: usize },

    #[error("max line length must be positive")]
    InvalidMaxLineLength,

    #[error("invalid line filter pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A referenceable slice of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub reference: String,
    pub content: String,
    /// First source line, 1-based.
    pub start_line: usize,
    /// Last source line, 1-based and inclusive.
    pub end_line: usize,
}

/// Approximate token cost of a line: a quarter of its character count, at
/// least one.
pub fn estimate_tokens(line: &str) -> usize {
    (line.chars().count() / 4).max(1)
}

/// Token-bounded sliding-window chunker.
#[derive(Debug, Clone)]
pub struct Segmenter {
    chunk_size: usize,
    overlap: usize,
    max_line_length: usize,
    filters: FileFilters,
}

impl Segmenter {
    /// Create a segmenter.
    ///
    /// `chunk_size` is the token budget per chunk, `overlap` the number of
    /// lines repeated between consecutive chunks, `max_line_length` the
    /// character count above which a line is dropped.
    pub fn new(
        chunk_size: usize,
        overlap: usize,
        max_line_length: usize,
    ) -> Result<Self, SegmenterError> {
        if chunk_size == 0 {
            return Err(SegmenterError::InvalidChunkSize);
        }
        if overlap >= chunk_size {
            return Err(SegmenterError::InvalidOverlap {
                overlap,
                chunk_size,
            });
        }
        if max_line_length == 0 {
            return Err(SegmenterError::InvalidMaxLineLength);
        }

        Ok(Self {
            chunk_size,
            overlap,
            max_line_length,
            filters: FileFilters::default(),
        })
    }

    /// Attach per-extension include/exclude filters.
    pub fn with_filters(
        mut self,
        filters: &HashMap<String, FilterPatterns>,
    ) -> Result<Self, SegmenterError> {
        self.filters = FileFilters::compile(filters)?;
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered chunks referencing `path`.
    pub fn chunk(&self, path: &str, text: &str) -> Vec<Chunk> {
        let lines = self.select_lines(path, text);
        if lines.is_empty() {
            return Vec::new();
        }

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < lines.len() {
            let end = self.window_end(&lines, start);

            let window = &lines[start..end];
            if window.iter().any(|(_, line)| !line.trim().is_empty()) {
                let content = window
                    .iter()
                    .map(|(_, line)| *line)
                    .collect::<Vec<_>>()
                    .join("\n");
                let start_line = window[0].0 + 1;
                let end_line = window[window.len() - 1].0 + 1;
                let reference = if start == 0 && end == lines.len() {
                    path.to_string()
                } else {
                    format!("{path}, Lines {start_line} to {end_line}")
                };
                chunks.push(Chunk {
                    reference,
                    content,
                    start_line,
                    end_line,
                });
            }

            if end >= lines.len() {
                break;
            }
            // Step back by the overlap but never onto or before the current start.
            start = end.saturating_sub(self.overlap).max(start + 1);
        }

        debug!("Segmented {path} into {} chunks", chunks.len());
        chunks
    }

    /// Lines that survive the length cap and the file-type filter, paired with
    /// their 0-based index in the original text.
    fn select_lines<'t>(&self, path: &str, text: &'t str) -> Vec<(usize, &'t str)> {
        let filter = self.filters.for_path(path);
        let mut dropped = 0usize;

        let lines: Vec<(usize, &str)> = text
            .split('\n')
            .enumerate()
            .filter(|(_, line)| {
                if line.chars().count() > self.max_line_length {
                    dropped += 1;
                    return false;
                }
                true
            })
            .filter(|(_, line)| filter.is_none_or(|f| f.keeps(line)))
            .collect();

        if dropped > 0 {
            debug!("Dropped {dropped} overlong lines from {path}");
        }
        lines
    }

    /// Exclusive end of the window starting at `start`. Always at least one
    /// line past `start`.
    fn window_end(&self, lines: &[(usize, &str)], start: usize) -> usize {
        let mut tokens = 0;
        let mut end = start;
        while end < lines.len() {
            let cost = estimate_tokens(lines[end].1);
            if end > start && tokens + cost > self.chunk_size {
                break;
            }
            tokens += cost;
            end += 1;
        }
        end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(count: usize) -> String {
        (1..=count)
            .map(|i| format!("line number {i:03} with some padding text"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rebuild the source from chunks by dropping each chunk's overlap with
    /// its predecessor.
    fn reconstruct(chunks: &[Chunk]) -> String {
        let mut lines: Vec<&str> = Vec::new();
        let mut covered = 0usize;
        for chunk in chunks {
            let skip = covered.saturating_sub(chunk.start_line - 1);
            lines.extend(chunk.content.split('\n').skip(skip));
            covered = chunk.end_line;
        }
        lines.join("\n")
    }

    #[test]
    fn test_rejects_overlap_not_below_chunk_size() {
        assert_eq!(
            Segmenter::new(10, 10, 1000).unwrap_err(),
            SegmenterError::InvalidOverlap {
                overlap: 10,
                chunk_size: 10
            }
        );
        assert!(Segmenter::new(10, 11, 1000).is_err());
        assert_eq!(
            Segmenter::new(0, 0, 1000).unwrap_err(),
            SegmenterError::InvalidChunkSize
        );
        assert_eq!(
            Segmenter::new(10, 2, 0).unwrap_err(),
            SegmenterError::InvalidMaxLineLength
        );
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 1);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens(&"x".repeat(41)), 10);
    }

    #[test]
    fn test_whole_input_uses_bare_path() {
        let segmenter = Segmenter::new(100, 2, 1000).unwrap();
        let chunks = segmenter.chunk("docs/readme.md", "first line\nsecond line");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].reference, "docs/readme.md");
        assert_eq!(chunks[0].content, "first line\nsecond line");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 2));
    }

    #[test]
    fn test_partial_chunks_use_line_references() {
        // Each line costs nine tokens, so a budget of 30 holds three lines.
        let text = numbered_lines(8);
        let segmenter = Segmenter::new(30, 1, 1000).unwrap();
        let chunks = segmenter.chunk("src/Program.cs", &text);

        assert_eq!(chunks[0].reference, "src/Program.cs, Lines 1 to 3");
        assert_eq!(chunks[1].reference, "src/Program.cs, Lines 3 to 5");
        assert_eq!(chunks[2].reference, "src/Program.cs, Lines 5 to 7");
        assert_eq!(chunks[3].reference, "src/Program.cs, Lines 7 to 8");
        assert_eq!(chunks.len(), 4);
    }

    #[test]
    fn test_chunks_reconstruct_source() {
        let text = numbered_lines(57);
        for (size, overlap) in [(30, 0), (30, 1), (30, 2), (50, 4), (11, 10)] {
            let segmenter = Segmenter::new(size, overlap, 1000).unwrap();
            let chunks = segmenter.chunk("a.txt", &text);
            assert_eq!(reconstruct(&chunks), text, "size={size} overlap={overlap}");
        }
    }

    #[test]
    fn test_start_positions_strictly_increase() {
        let text = numbered_lines(500);
        let segmenter = Segmenter::new(11, 10, 1000).unwrap();
        let chunks = segmenter.chunk("big.txt", &text);

        assert!(chunks.len() <= 500);
        for pair in chunks.windows(2) {
            assert!(pair[1].start_line > pair[0].start_line);
        }
        assert_eq!(chunks.last().unwrap().end_line, 500);
    }

    #[test]
    fn test_oversized_line_forms_its_own_chunk() {
        let long = "word ".repeat(40);
        let text = format!("short\n{long}\nshort again");
        let segmenter = Segmenter::new(5, 0, 1000).unwrap();
        let chunks = segmenter.chunk("x.md", &text);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].content, long);
    }

    #[test]
    fn test_overlong_lines_are_dropped() {
        let minified = "a".repeat(5000);
        let text = format!("keep me\n{minified}\nkeep me too");
        let segmenter = Segmenter::new(100, 1, 200).unwrap();
        let chunks = segmenter.chunk("bundle.js", &text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "keep me\nkeep me too");
        assert_eq!(chunks[0].reference, "bundle.js");
        assert_eq!((chunks[0].start_line, chunks[0].end_line), (1, 3));
    }

    #[test]
    fn test_whitespace_only_windows_are_skipped() {
        let segmenter = Segmenter::new(2, 0, 1000).unwrap();
        let chunks = segmenter.chunk("notes.txt", "alpha\n  \n\t\n\nomega");

        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["alpha\n  ", "omega"]);
        assert!(segmenter.chunk("empty.txt", "").is_empty());
        assert!(segmenter.chunk("blank.txt", "   \n\n  ").is_empty());
    }

    #[test]
    fn test_filters_apply_by_extension() {
        let mut filters = HashMap::new();
        filters.insert(
            "cs".to_string(),
            FilterPatterns {
                include: vec![],
                exclude: vec![r"^\s*using ".to_string()],
            },
        );
        let segmenter = Segmenter::new(100, 1, 1000)
            .unwrap()
            .with_filters(&filters)
            .unwrap();

        let source = "using System;\nusing System.Linq;\nclass Program {}\n";
        let cs = segmenter.chunk("Program.cs", source);
        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].content, "class Program {}\n");
        assert_eq!(cs[0].reference, "Program.cs");
        assert_eq!(cs[0].start_line, 3);

        let md = segmenter.chunk("notes.md", source);
        assert_eq!(md[0].content, source);
    }

    #[test]
    fn test_single_line_sentence() {
        let text = "alpha beta alpha beta alpha beta alpha beta";
        let segmenter = Segmenter::new(10, 3, 1000).unwrap();
        let chunks = segmenter.chunk("words.txt", text);

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, text);
        assert_eq!(chunks[0].reference, "words.txt");
    }
}
