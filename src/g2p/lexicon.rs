//! Pronouncing-dictionary lookup in the CMU dictionary format.
//!
//! Accepted line shapes:
//! - `WORD  AH0 B K` (classic `cmudict-0.7b`, two-space separator)
//! - `word ah0 b k # comment` (`cmudict.dict`, single space, trailing comment)
//! - `WORD(2)  ...` alternate pronunciations, ignored (first one wins)
//! - `;;;` comment lines

use crate::error::{AlignError, Result};
use crate::g2p::{Phonemizer, WORD_BOUNDARY};
use std::collections::HashMap;
use std::path::Path;

/// Phonemizer backed by an in-memory word → phonemes table.
#[derive(Debug, Clone, Default)]
pub struct LexiconPhonemizer {
    entries: HashMap<String, Vec<String>>,
    name: String,
}

impl LexiconPhonemizer {
    /// Build from explicit entries; words are matched case-insensitively.
    pub fn from_entries<W, P>(entries: impl IntoIterator<Item = (W, P)>) -> Self
    where
        W: AsRef<str>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut lexicon = Self {
            entries: HashMap::new(),
            name: "lexicon".to_string(),
        };
        for (word, phonemes) in entries {
            lexicon.insert(word.as_ref(), phonemes.into_iter().map(Into::into).collect());
        }
        lexicon
    }

    /// Parse dictionary text.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut lexicon = Self::from_entries(std::iter::empty::<(&str, Vec<String>)>());
        for (index, line) in contents.lines().enumerate() {
            let line = line.split(" #").next().unwrap_or(line).trim();
            if line.is_empty() || line.starts_with(";;;") {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(head) = fields.next() else {
                continue;
            };
            let phonemes: Vec<String> = fields.map(str::to_string).collect();
            if phonemes.is_empty() {
                return Err(AlignError::Lexicon {
                    message: format!("line {}: entry {head:?} has no phonemes", index + 1),
                });
            }

            if is_variant(head) {
                continue;
            }
            lexicon.insert(head, phonemes);
        }
        Ok(lexicon)
    }

    /// Load a dictionary file. Latin-1 bytes in older dictionaries are
    /// decoded lossily.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| AlignError::Lexicon {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;
        let mut lexicon = Self::parse(&String::from_utf8_lossy(&bytes))?;
        lexicon.name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "lexicon".to_string());
        tracing::debug!(
            path = %path.display(),
            entries = lexicon.len(),
            "loaded pronunciation lexicon"
        );
        Ok(lexicon)
    }

    fn insert(&mut self, word: &str, phonemes: Vec<String>) {
        self.entries.entry(word.to_uppercase()).or_insert(phonemes);
    }

    /// Pronunciation of a single word, if known.
    pub fn lookup(&self, word: &str) -> Option<&[String]> {
        self.entries.get(&word.to_uppercase()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `WORD(1)`, `WORD(2)`, ... mark alternate pronunciations.
fn is_variant(head: &str) -> bool {
    head.strip_suffix(')')
        .and_then(|rest| rest.rsplit_once('('))
        .is_some_and(|(word, n)| !word.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

impl Phonemizer for LexiconPhonemizer {
    fn phonemize(&self, text: &str) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for (i, word) in text.split_whitespace().enumerate() {
            if i > 0 {
                out.push(WORD_BOUNDARY.to_string());
            }
            if let Some(phonemes) = self.lookup(word) {
                out.extend(phonemes.iter().cloned());
            }
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
