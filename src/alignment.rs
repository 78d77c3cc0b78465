//! Phoneme- and word-level alignment types and their on-disk formats.

use crate::error::{AlignError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// One phoneme with its time span in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeSegment {
    #[serde(rename = "phoneme")]
    pub label: String,
    pub start: f64,
    pub end: f64,
}

impl PhonemeSegment {
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A word (or silence) and the phonemes the decoder assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(rename = "word")]
    pub label: String,
    pub phonemes: Vec<PhonemeSegment>,
}

impl Word {
    pub fn new(label: impl Into<String>, phonemes: Vec<PhonemeSegment>) -> Self {
        Self {
            label: label.into(),
            phonemes,
        }
    }

    pub fn start(&self) -> f64 {
        self.phonemes.first().map_or(0.0, |p| p.start)
    }

    pub fn end(&self) -> f64 {
        self.phonemes.last().map_or(0.0, |p| p.end)
    }
}

/// Ordered words whose phonemes tile the utterance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Alignment {
    pub words: Vec<Word>,
}

/// Output formats selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFormat {
    Json,
    TextGrid,
}

impl AlignmentFormat {
    /// `.json` and `.TextGrid` (any case) are recognized.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Self::Json),
            "textgrid" => Ok(Self::TextGrid),
            _ => Err(AlignError::AlignmentFormat {
                message: format!(
                    "cannot infer format of {} (expected .json or .TextGrid)",
                    path.display()
                ),
            }),
        }
    }
}

impl Alignment {
    pub fn new(words: Vec<Word>) -> Self {
        Self { words }
    }

    /// All phonemes in temporal order.
    pub fn phonemes(&self) -> impl Iterator<Item = &PhonemeSegment> {
        self.words.iter().flat_map(|w| w.phonemes.iter())
    }

    pub fn phoneme_count(&self) -> usize {
        self.words.iter().map(|w| w.phonemes.len()).sum()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.phonemes().map(PhonemeSegment::duration).collect()
    }

    pub fn start(&self) -> f64 {
        self.phonemes().next().map_or(0.0, |p| p.start)
    }

    pub fn end(&self) -> f64 {
        self.phonemes().last().map_or(0.0, |p| p.end)
    }

    /// Rebuild timestamps from per-phoneme durations by cumulative sum from 0.
    ///
    /// `durations` must have one entry per phoneme. Each phoneme's start is
    /// the exact `f64` the previous phoneme ends on.
    pub fn with_durations(&self, durations: &[f64]) -> Result<Self> {
        if durations.len() != self.phoneme_count() {
            return Err(AlignError::invalid_input(format!(
                "{} durations for {} phonemes",
                durations.len(),
                self.phoneme_count()
            )));
        }

        let mut cursor = 0.0;
        let mut durations = durations.iter();
        let words = self
            .words
            .iter()
            .map(|word| {
                let phonemes = word
                    .phonemes
                    .iter()
                    .zip(durations.by_ref())
                    .map(|(phoneme, duration)| {
                        let start = cursor;
                        cursor += duration;
                        PhonemeSegment::new(phoneme.label.clone(), start, cursor)
                    })
                    .collect();
                Word::new(word.label.clone(), phonemes)
            })
            .collect();
        Ok(Self { words })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Praat TextGrid (long text format) with `words` and `phones` tiers.
    pub fn to_textgrid(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        if let Err(e) = write_textgrid(&mut out, self) {
            tracing::error!(error = %e, "formatting TextGrid failed");
        }
        out
    }

    /// Save in the format implied by the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match AlignmentFormat::from_path(path)? {
            AlignmentFormat::Json => self.to_json()?,
            AlignmentFormat::TextGrid => self.to_textgrid(),
        };
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Load a JSON alignment. TextGrid files are write-only.
    pub fn load(path: &Path) -> Result<Self> {
        match AlignmentFormat::from_path(path)? {
            AlignmentFormat::Json => Self::from_json(&std::fs::read_to_string(path)?),
            AlignmentFormat::TextGrid => Err(AlignError::AlignmentFormat {
                message: format!("reading TextGrid is not supported: {}", path.display()),
            }),
        }
    }
}

fn write_textgrid(out: &mut String, alignment: &Alignment) -> std::fmt::Result {
    let (xmin, xmax) = (alignment.start(), alignment.end());
    writeln!(out, "File type = \"ooTextFile\"")?;
    writeln!(out, "Object class = \"TextGrid\"")?;
    writeln!(out)?;
    writeln!(out, "xmin = {xmin}")?;
    writeln!(out, "xmax = {xmax}")?;
    writeln!(out, "tiers? <exists>")?;
    writeln!(out, "size = 2")?;
    writeln!(out, "item []:")?;

    let words: Vec<(f64, f64, &str)> = alignment
        .words
        .iter()
        .map(|w| (w.start(), w.end(), w.label.as_str()))
        .collect();
    let phones: Vec<(f64, f64, &str)> = alignment
        .phonemes()
        .map(|p| (p.start, p.end, p.label.as_str()))
        .collect();

    write_tier(out, 1, "words", xmin, xmax, &words)?;
    write_tier(out, 2, "phones", xmin, xmax, &phones)
}

fn write_tier(
    out: &mut String,
    index: usize,
    name: &str,
    xmin: f64,
    xmax: f64,
    intervals: &[(f64, f64, &str)],
) -> std::fmt::Result {
    writeln!(out, "    item [{index}]:")?;
    writeln!(out, "        class = \"IntervalTier\"")?;
    writeln!(out, "        name = \"{name}\"")?;
    writeln!(out, "        xmin = {xmin}")?;
    writeln!(out, "        xmax = {xmax}")?;
    writeln!(out, "        intervals: size = {}", intervals.len())?;
    for (i, (start, end, text)) in intervals.iter().enumerate() {
        writeln!(out, "        intervals [{}]:", i + 1)?;
        writeln!(out, "            xmin = {start}")?;
        writeln!(out, "            xmax = {end}")?;
        writeln!(out, "            text = \"{}\"", text.replace('"', "\"\""))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Alignment {
        Alignment::new(vec![
            Word::new("sil", vec![PhonemeSegment::new("sil", 0.0, 0.1)]),
            Word::new(
                "CAT",
                vec![
                    PhonemeSegment::new("K", 0.1, 0.2),
                    PhonemeSegment::new("AE1", 0.2, 0.35),
                    PhonemeSegment::new("T", 0.35, 0.4),
                ],
            ),
            Word::new("sp", vec![PhonemeSegment::new("sp", 0.4, 0.4)]),
        ])
    }

    #[test]
    fn test_phonemes_flatten_in_order() {
        let alignment = sample();
        let labels: Vec<&str> = alignment.phonemes().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["sil", "K", "AE1", "T", "sp"]);
        assert_eq!(sample().phoneme_count(), 5);
    }

    #[test]
    fn test_word_bounds() {
        let alignment = sample();
        assert_eq!(alignment.words[1].start(), 0.1);
        assert_eq!(alignment.words[1].end(), 0.4);
        assert_eq!(alignment.end(), 0.4);
    }

    #[test]
    fn test_with_durations_is_contiguous() {
        let alignment = sample()
            .with_durations(&[0.5, 0.1, 0.2, 0.3, 0.25])
            .unwrap();
        let phonemes: Vec<&PhonemeSegment> = alignment.phonemes().collect();

        assert_eq!(phonemes[0].start, 0.0);
        for pair in phonemes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!((alignment.end() - 1.35).abs() < 1e-12);
        assert_eq!(alignment.words[1].label, "CAT");
    }

    #[test]
    fn test_with_durations_rejects_wrong_length() {
        assert!(sample().with_durations(&[1.0]).is_err());
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let alignment = sample()
            .with_durations(&[0.1 + 0.2, 1.0 / 3.0, 0.012_5 * 11000.0 / 11025.0, 1e-9, 0.7])
            .unwrap();
        let json = alignment.to_json().unwrap();
        let loaded = Alignment::from_json(&json).unwrap();
        assert_eq!(loaded, alignment);
    }

    #[test]
    fn test_json_field_names() {
        let json = sample().to_json().unwrap();
        assert!(json.contains("\"words\""));
        assert!(json.contains("\"word\": \"CAT\""));
        assert!(json.contains("\"phoneme\": \"AE1\""));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            AlignmentFormat::from_path(Path::new("a.json")).unwrap(),
            AlignmentFormat::Json
        );
        assert_eq!(
            AlignmentFormat::from_path(Path::new("a.TextGrid")).unwrap(),
            AlignmentFormat::TextGrid
        );
        assert!(AlignmentFormat::from_path(Path::new("a.txt")).is_err());
        assert!(AlignmentFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");

        sample().save(&path).unwrap();
        assert_eq!(Alignment::load(&path).unwrap(), sample());
    }

    #[test]
    fn test_textgrid_layout() {
        let grid = sample().to_textgrid();
        assert!(grid.starts_with("File type = \"ooTextFile\"\n"));
        assert!(grid.contains("name = \"words\""));
        assert!(grid.contains("name = \"phones\""));
        assert!(grid.contains("intervals: size = 3"));
        assert!(grid.contains("intervals: size = 5"));
        assert!(grid.contains("text = \"AE1\""));
    }

    #[test]
    fn test_textgrid_intervals_and_quoting() {
        let alignment = Alignment::new(vec![Word::new(
            "SAY \"HI\"",
            vec![
                PhonemeSegment::new("HH", 0.0, 0.25),
                PhonemeSegment::new("AY1", 0.25, 0.5),
            ],
        )]);
        let grid = alignment.to_textgrid();

        assert!(grid.contains("xmax = 0.5\n"));
        assert!(grid.contains("text = \"SAY \"\"HI\"\"\""));
        assert!(grid.contains(
            "        intervals [2]:\n            xmin = 0.25\n            xmax = 0.5\n            text = \"AY1\"\n"
        ));
        assert_eq!(grid.matches("class = \"IntervalTier\"").count(), 2);
    }

    #[test]
    fn test_textgrid_is_write_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.TextGrid");
        sample().save(&path).unwrap();
        assert!(matches!(
            Alignment::load(&path),
            Err(AlignError::AlignmentFormat { .. })
        ));
    }
}
