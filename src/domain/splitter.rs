//! Text splitters for bounding prompt payloads.
//!
//! Splits arbitrarily long text into chunks no longer than a configured size,
//! carrying a bounded overlap between adjacent chunks so context is not lost
//! at the seams. The recursive splitter tries separators from coarsest
//! (paragraph break) to finest (single character), recursing into weaker
//! separators for any piece that is still too large.
//!
//! Chunk lengths are measured in characters, so splitting can never land
//! inside a multi-byte code point.

use once_cell::sync::Lazy;
use thiserror::Error;
use tracing::warn;

use crate::config::{SPLITTER_DEFAULT_CHUNK_OVERLAP, SPLITTER_DEFAULT_CHUNK_SIZE};

/// Separators tried in priority order by the recursive splitter.
static DEFAULT_SEPARATORS: Lazy<Vec<String>> = Lazy::new(|| {
    ["\n\n", "\n", ".", ",", " ", ""]
        .iter()
        .map(|s| s.to_string())
        .collect()
});

/// Splitter configuration errors. Fatal: raised at construction, never at
/// split time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SplitterError {
    #[error("chunk overlap {chunk_overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge {
        chunk_size: usize,
        chunk_overlap: usize,
    },
}

/// Size and overlap bounds shared by all splitters.
///
/// Invariant: `chunk_overlap < chunk_size`, enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SplitterConfig {
    /// Creates a config, rejecting overlaps that meet or exceed the chunk size.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_overlap >= chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                chunk_size,
                chunk_overlap,
            });
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters carried over between adjacent chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Merges small pieces into chunks close to `chunk_size`, re-joining with
    /// `separator` and carrying at most `chunk_overlap` characters into the
    /// next chunk.
    ///
    /// `total` tracks the joined length of the pending group, separators
    /// included. A single piece longer than `chunk_size` is emitted as an
    /// oversized chunk rather than looping forever; callers observing an
    /// oversized result must treat it as "cannot shrink further".
    fn merge_splits(&self, splits: Vec<String>, separator: &str) -> Vec<String> {
        let separator_len = separator.chars().count();
        let mut docs = Vec::new();
        let mut current: Vec<String> = Vec::new();
        let mut total = 0usize;

        for piece in splits {
            let piece_len = piece.chars().count();
            let sep_cost = if current.is_empty() { 0 } else { separator_len };

            if total + piece_len + sep_cost >= self.chunk_size {
                if total > self.chunk_size {
                    warn!(
                        chunk_len = total,
                        chunk_size = self.chunk_size,
                        "produced a chunk longer than the configured chunk size"
                    );
                }
                if !current.is_empty() {
                    if let Some(doc) = join_pieces(&current, separator) {
                        docs.push(doc);
                    }
                    // Keep popping while the carried prefix is larger than the
                    // overlap, or while the next piece would still not fit.
                    while total > self.chunk_overlap
                        || (total + piece_len + separator_len > self.chunk_size && total > 0)
                    {
                        if current.is_empty() {
                            break;
                        }
                        let front = current.remove(0);
                        let front_sep = if current.is_empty() { 0 } else { separator_len };
                        total -= front.chars().count() + front_sep;
                    }
                }
            }

            total += piece_len + if current.is_empty() { 0 } else { separator_len };
            current.push(piece);
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: SPLITTER_DEFAULT_CHUNK_SIZE,
            chunk_overlap: SPLITTER_DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Joins accumulated pieces; an empty result after trimming yields no chunk.
fn join_pieces(pieces: &[String], separator: &str) -> Option<String> {
    let text = pieces.join(separator).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Splits `text` on `separator`; an empty separator splits per character.
fn split_on(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        text.chars().map(String::from).collect()
    } else {
        text.split(separator).map(String::from).collect()
    }
}

/// Common splitting interface.
pub trait TextSplitter {
    /// Splits `text` into chunks bounded by the configured chunk size.
    fn split_text(&self, text: &str) -> Vec<String>;

    /// Splits every text in `texts`, concatenating the results in order.
    fn create_documents(&self, texts: &[String]) -> Vec<String> {
        texts.iter().flat_map(|text| self.split_text(text)).collect()
    }
}

/// Splits on a single fixed separator.
#[derive(Debug, Clone)]
pub struct CharacterTextSplitter {
    config: SplitterConfig,
    separator: String,
}

impl CharacterTextSplitter {
    /// Creates a splitter with the default paragraph-break separator.
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            config,
            separator: "\n\n".to_string(),
        }
    }

    /// Sets the separator to split on.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl TextSplitter for CharacterTextSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        let splits = split_on(text, &self.separator);
        self.config.merge_splits(splits, &self.separator)
    }
}

/// Splits on a prioritized list of separators, recursing into weaker
/// separators for pieces that are still too large.
#[derive(Debug, Clone)]
pub struct RecursiveCharacterTextSplitter {
    config: SplitterConfig,
    separators: Vec<String>,
}

impl RecursiveCharacterTextSplitter {
    /// Creates a splitter with the default separator priority list
    /// (paragraph, line, sentence, clause, word, character).
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            config,
            separators: DEFAULT_SEPARATORS.clone(),
        }
    }

    /// Replaces the separator priority list.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// First separator present in `text`, falling back to the weakest.
    fn pick_separator(&self, text: &str) -> String {
        self.separators
            .iter()
            .find(|s| s.is_empty() || text.contains(s.as_str()))
            .or_else(|| self.separators.last())
            .cloned()
            .unwrap_or_default()
    }
}

impl TextSplitter for RecursiveCharacterTextSplitter {
    fn split_text(&self, text: &str) -> Vec<String> {
        let separator = self.pick_separator(text);
        let splits = split_on(text, &separator);

        let mut final_chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in splits {
            // A piece that fits accumulates. At the character level there is
            // nothing weaker to recurse into, so single characters always
            // accumulate as well.
            if piece.chars().count() < self.config.chunk_size() || separator.is_empty() {
                good.push(piece);
            } else {
                if !good.is_empty() {
                    final_chunks
                        .extend(self.config.merge_splits(std::mem::take(&mut good), &separator));
                }
                final_chunks.extend(self.split_text(&piece));
            }
        }
        if !good.is_empty() {
            final_chunks.extend(self.config.merge_splits(good, &separator));
        }
        final_chunks
    }
}
