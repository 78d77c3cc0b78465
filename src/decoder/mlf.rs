//! Reading phoneme-level HTK master label files.
//!
//! HVite run with `-a -m` writes one line per phoneme:
//!
//! ```text
//! #!MLF!#
//! "/path/to/tmp.rec"
//! 0 1200000 sil -512.3 sil
//! 1200000 1700000 K -140.1 CAT
//! 1700000 2500000 AE1 -201.7
//! 2500000 2900000 T -88.0
//! 2900000 2900000 sp -0.1 sp
//! .
//! ```
//!
//! Times are integers in 100 ns units. A fifth field opens a new word;
//! lines without one extend the current word.

use crate::alignment::{Alignment, PhonemeSegment, Word};
use crate::defaults::HTK_TIME_UNIT_SECS;
use crate::error::{AlignError, Result};
use std::path::Path;

/// Parse MLF text into a raw (uncorrected) alignment in seconds.
///
/// A header with no segments yields an empty alignment; rejecting that is
/// up to the caller.
pub fn parse(contents: &str) -> Result<Alignment> {
    let mut words: Vec<Word> = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line == "#!MLF!#" || line == "." || line.starts_with('"') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if !(3..=5).contains(&fields.len()) {
            return Err(AlignError::decoder_output(format!(
                "line {}: expected 3 to 5 fields, got {}: {line:?}",
                index + 1,
                fields.len()
            )));
        }

        let start = parse_time(fields[0], index)?;
        let end = parse_time(fields[1], index)?;
        let phoneme = PhonemeSegment::new(fields[2], start, end);

        if let Some(label) = fields.get(4) {
            words.push(Word::new(*label, vec![phoneme]));
        } else if let Some(word) = words.last_mut() {
            word.phonemes.push(phoneme);
        } else {
            // Output not started with a word label: the phoneme stands alone.
            words.push(Word::new(fields[2], vec![phoneme]));
        }
    }

    Ok(Alignment::new(words))
}

/// Read and parse an MLF file.
pub fn read(path: &Path) -> Result<Alignment> {
    let bytes = std::fs::read(path)?;
    let contents = String::from_utf8_lossy(&bytes);
    if contents.trim().is_empty() {
        return Err(AlignError::DecoderFailed {
            tool: "HVite".to_string(),
            message: format!("alignment output {} is empty", path.display()),
        });
    }
    parse(&contents)
}

fn parse_time(field: &str, index: usize) -> Result<f64> {
    let units: i64 = field.parse().map_err(|_| {
        AlignError::decoder_output(format!("line {}: invalid time {field:?}", index + 1))
    })?;
    Ok(units as f64 * HTK_TIME_UNIT_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "#!MLF!#
\"/tmp/ws/tmp.rec\"
0 1200000 sil -512.3 sil
1200000 1700000 K -140.1 CAT
1700000 2500000 AE1 -201.7
2500000 2900000 T -88.0
2900000 2900000 sp -0.1 sp
.
";

    #[test]
    fn test_parse_groups_phonemes_into_words() {
        let alignment = parse(SAMPLE).unwrap();
        let words: Vec<&str> = alignment.words.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(words, vec!["sil", "CAT", "sp"]);
        assert_eq!(alignment.words[1].phonemes.len(), 3);
        assert_eq!(alignment.phoneme_count(), 5);
    }

    #[test]
    fn test_parse_converts_units_to_seconds() {
        let alignment = parse(SAMPLE).unwrap();
        let cat = &alignment.words[1];
        assert!((cat.phonemes[0].start - 0.12).abs() < 1e-12);
        assert!((cat.phonemes[0].end - 0.17).abs() < 1e-12);
        assert!((alignment.end() - 0.29).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_pause_is_kept() {
        let alignment = parse(SAMPLE).unwrap();
        let sp = &alignment.words[2].phonemes[0];
        assert_eq!(sp.label, "sp");
        assert_eq!(sp.duration(), 0.0);
    }

    #[test]
    fn test_three_field_lines_without_scores() {
        let alignment = parse("0 100 K\n100 300 AE1\n").unwrap();
        assert_eq!(alignment.words.len(), 1);
        assert_eq!(alignment.words[0].label, "K");
        assert_eq!(alignment.phoneme_count(), 2);
    }

    #[test]
    fn test_header_only_is_empty_alignment() {
        let alignment = parse("#!MLF!#\n\"x.rec\"\n.\n").unwrap();
        assert_eq!(alignment.phoneme_count(), 0);
    }

    #[test]
    fn test_malformed_lines() {
        for bad in ["0 100", "0 100 K -1 CAT extra", "zero 100 K", "0 1.5 K"] {
            let result = parse(bad);
            assert!(
                matches!(result, Err(AlignError::DecoderOutput { .. })),
                "{bad}: {result:?}"
            );
        }
    }

    #[test]
    fn test_read_empty_file_is_decoder_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alignment.mlf");
        std::fs::write(&path, "\n").unwrap();
        assert!(matches!(read(&path), Err(AlignError::DecoderFailed { .. })));
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let result = read(Path::new("/nonexistent/alignment.mlf"));
        assert!(matches!(result, Err(AlignError::Io(_))));
    }

    #[test]
    fn test_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alignment.mlf");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(read(&path).unwrap(), parse(SAMPLE).unwrap());
    }
}
