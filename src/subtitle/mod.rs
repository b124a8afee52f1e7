//! # Subtitle Segmentation
//!
//! Splits a scene's narration into caption chunks that are shown one after
//! another while the scene's audio plays. Chunk `i` of `n` is active for the
//! progress slice `[i/n, (i+1)/n)`.

pub mod segmenter;

pub use segmenter::{caption_index, Segmenter};

/// Clauses longer than this many characters are re-split on word boundaries
pub const DEFAULT_MAX_CHARS_PER_LINE: usize = 25;
