//! Transcript normalization ahead of pronunciation lookup.

use crate::text::numbers::{EnglishNumbers, NumberExpander};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Non-ASCII quotes and dashes stripped alongside ASCII punctuation.
pub const TYPOGRAPHIC_PUNCTUATION: &[char] = &['“', '”', '‘', '’', '—', '–'];

/// Characters replaced by a space so compounds split into separate words.
pub const DEFAULT_JOINERS: &[char] = &['-'];

/// Data-driven text normalizer.
///
/// Collapses whitespace, spells out numbers, then removes everything in the
/// strip set. Joiner characters become spaces instead of disappearing.
#[derive(Clone)]
pub struct Normalizer {
    strip: BTreeSet<char>,
    joiners: BTreeSet<char>,
    numbers: Arc<dyn NumberExpander>,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer")
            .field("strip", &self.strip)
            .field("joiners", &self.joiners)
            .finish_non_exhaustive()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::english()
    }
}

impl Normalizer {
    /// Build a normalizer from explicit character sets and a number strategy.
    ///
    /// A character present in both sets is treated as a joiner.
    pub fn new(
        strip: impl IntoIterator<Item = char>,
        joiners: impl IntoIterator<Item = char>,
        numbers: Arc<dyn NumberExpander>,
    ) -> Self {
        let joiners: BTreeSet<char> = joiners.into_iter().collect();
        let strip = strip.into_iter().filter(|c| !joiners.contains(c)).collect();
        Self {
            strip,
            joiners,
            numbers,
        }
    }

    /// ASCII punctuation (minus the hyphen) plus typographic quotes and
    /// dashes, with English number readings.
    pub fn english() -> Self {
        let ascii = (0u8..=127)
            .map(char::from)
            .filter(|c| c.is_ascii_punctuation());
        Self::new(
            ascii.chain(TYPOGRAPHIC_PUNCTUATION.iter().copied()),
            DEFAULT_JOINERS.iter().copied(),
            Arc::new(EnglishNumbers),
        )
    }

    /// Add characters to the strip set.
    pub fn with_extra_strip(mut self, extra: impl IntoIterator<Item = char>) -> Self {
        for c in extra {
            if !self.joiners.contains(&c) {
                self.strip.insert(c);
            }
        }
        self
    }

    /// Normalize `text` into a single-spaced, punctuation-free string.
    ///
    /// Idempotent: normalizing the output again returns it unchanged.
    pub fn normalize(&self, text: &str) -> String {
        let collapsed = collapse_whitespace(text);
        let expanded = self.numbers.expand(&collapsed);

        let stripped: String = expanded
            .chars()
            .filter(|c| !self.strip.contains(c))
            .map(|c| if self.joiners.contains(&c) { ' ' } else { c })
            .collect();

        collapse_whitespace(&stripped)
    }

    /// Normalize and split into uppercase word tokens, in transcript order.
    pub fn words(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(str::to_uppercase)
            .collect()
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
