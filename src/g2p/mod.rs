//! Grapheme-to-phoneme conversion.
//!
//! The aligner treats G2P as a black box behind [`Phonemizer`]. A
//! lexicon-backed implementation is provided for CMU-style dictionaries.

pub mod lexicon;

pub use lexicon::LexiconPhonemizer;

use crate::error::Result;
use std::sync::Arc;

/// Marker emitted between the phonemes of consecutive words.
pub const WORD_BOUNDARY: &str = " ";

/// Trait for grapheme-to-phoneme engines.
///
/// Implementations must be stateless per call so a single instance can be
/// shared by every batch worker.
pub trait Phonemizer: Send + Sync {
    /// Convert whitespace-separated words into a flat phoneme list.
    ///
    /// Consecutive words are separated by [`WORD_BOUNDARY`]. A word the
    /// engine cannot pronounce contributes no phonemes.
    fn phonemize(&self, text: &str) -> Result<Vec<String>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Implement Phonemizer for Arc<T> to allow sharing across workers.
impl<T: Phonemizer + ?Sized> Phonemizer for Arc<T> {
    fn phonemize(&self, text: &str) -> Result<Vec<String>> {
        (**self).phonemize(text)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
