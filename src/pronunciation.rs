//! Pronunciation dictionary and word-sequence construction.
//!
//! Produces the two text artifacts HVite consumes besides audio: a sorted
//! pronunciation dictionary and a master label file listing the words to
//! align, with an optional short pause around every word.

use crate::defaults::SILENCE_LABEL;
use crate::error::Result;
use crate::g2p::{Phonemizer, WORD_BOUNDARY};
use std::collections::{BTreeMap, HashSet};

/// Label file pattern the word sequence is registered under.
///
/// Must match the stem of the feature file listed in the decoder script.
pub const LABEL_PATTERN: &str = "\"*/tmp.lab\"";

/// Pronunciations for one transcript.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pronunciations {
    /// Distinct word → phonemes. Words without phonemes map to an empty list.
    pub dictionary: BTreeMap<String, Vec<String>>,
    /// `sp W1 sp W2 ... sp`, in transcript order.
    pub word_sequence: Vec<String>,
    /// Words the phonemizer could not pronounce, in first-occurrence order.
    pub gaps: Vec<String>,
}

impl Pronunciations {
    /// Dictionary file contents: `WORD  ph1 ph2\n` lines plus `sp  sp`,
    /// sorted lexicographically by the full line.
    pub fn dictionary_file(&self) -> String {
        let mut lines: Vec<String> = self
            .dictionary
            .iter()
            .map(|(word, phonemes)| format!("{word}  {}\n", phonemes.join(" ")))
            .collect();
        lines.push(format!("{SILENCE_LABEL}  {SILENCE_LABEL}\n"));
        lines.sort();
        lines.concat()
    }

    /// Master label file listing the word sequence.
    pub fn word_sequence_file(&self) -> String {
        let mut out = String::from("#!MLF!#\n");
        out.push_str(LABEL_PATTERN);
        out.push('\n');
        for label in &self.word_sequence {
            out.push_str(label);
            out.push('\n');
        }
        out.push_str(".\n");
        out
    }

    /// Number of transcript words (silence markers excluded).
    pub fn word_count(&self) -> usize {
        self.word_sequence.len().saturating_sub(1) / 2
    }
}

/// Builds [`Pronunciations`] through a [`Phonemizer`].
pub struct PronunciationBuilder<'a> {
    phonemizer: &'a dyn Phonemizer,
}

impl<'a> PronunciationBuilder<'a> {
    pub fn new(phonemizer: &'a dyn Phonemizer) -> Self {
        Self { phonemizer }
    }

    /// Look up every distinct word and lay out the word sequence.
    ///
    /// Unpronounceable words are kept with an empty pronunciation and
    /// reported through a warning and [`Pronunciations::gaps`].
    pub fn build(&self, words: &[String]) -> Result<Pronunciations> {
        let mut seen = HashSet::new();
        let distinct: Vec<&String> = words.iter().filter(|w| seen.insert(*w)).collect();

        let per_word = self.lookup_distinct(&distinct)?;

        let mut pronunciations = Pronunciations::default();
        for (word, phonemes) in distinct.iter().zip(per_word) {
            if phonemes.is_empty() {
                tracing::warn!(
                    word = %word,
                    phonemizer = self.phonemizer.name(),
                    "no pronunciation found; aligning with an empty pronunciation"
                );
                pronunciations.gaps.push((*word).clone());
            }
            pronunciations.dictionary.insert((*word).clone(), phonemes);
        }

        pronunciations.word_sequence.push(SILENCE_LABEL.to_string());
        for word in words {
            pronunciations.word_sequence.push(word.clone());
            pronunciations.word_sequence.push(SILENCE_LABEL.to_string());
        }

        Ok(pronunciations)
    }

    /// One phonemizer call for all distinct words, falling back to one call
    /// per word when the batched output cannot be split 1:1.
    fn lookup_distinct(&self, distinct: &[&String]) -> Result<Vec<Vec<String>>> {
        if distinct.is_empty() {
            return Ok(Vec::new());
        }

        let joined = distinct
            .iter()
            .map(|w| w.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let segments = split_words(&self.phonemizer.phonemize(&joined)?);
        if segments.len() == distinct.len() {
            return Ok(segments);
        }

        tracing::debug!(
            words = distinct.len(),
            segments = segments.len(),
            "batched phonemization did not segment cleanly; looking up words individually"
        );
        distinct
            .iter()
            .map(|word| {
                let phonemes = self.phonemizer.phonemize(word)?;
                Ok(phonemes
                    .into_iter()
                    .filter(|p| p != WORD_BOUNDARY)
                    .collect())
            })
            .collect()
    }
}

/// Split a flat phoneme list at word-boundary markers.
///
/// Every marker closes a segment, so adjacent markers yield an empty
/// segment for an unpronounced word. A leading or trailing empty segment is
/// dropped.
pub fn split_words(phonemes: &[String]) -> Vec<Vec<String>> {
    let mut segments = vec![Vec::new()];
    for phoneme in phonemes {
        if phoneme == WORD_BOUNDARY {
            segments.push(Vec::new());
        } else if let Some(current) = segments.last_mut() {
            current.push(phoneme.clone());
        }
    }

    if segments.last().is_some_and(Vec::is_empty) {
        segments.pop();
    }
    if segments.first().is_some_and(Vec::is_empty) {
        segments.remove(0);
    }
    segments
}
