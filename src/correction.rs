//! Rate and offset correction of raw decoder alignments.
//!
//! The decoder's durations drift against the real audio in two ways: its
//! front end delays the first phoneme by a fixed analysis latency, and its
//! internal clock runs at a slightly different rate than the audio. After
//! correcting both, whatever residual error remains is absorbed by the last
//! phoneme so the alignment ends exactly at the end of the audio.
//!
//! The steps are applied in this order:
//! 1. the first duration gets the additive onset offset
//! 2. every duration is scaled by the rate ratio
//! 3. the last duration is replaced by `true_duration - sum(others)`
//!
//! With a single phoneme step 3 overwrites steps 1-2 entirely.

use crate::alignment::Alignment;
use crate::defaults::{DECODER_CLOCK_HZ, DECODER_NOMINAL_HZ, ONSET_OFFSET_SECS};
use crate::error::{AlignError, Result};

/// Decoder-specific correction constants.
///
/// These are measured against one decoder's feature extraction. A different
/// decoder needs its own values; nothing here is universal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionPolicy {
    /// Seconds added to the first phoneme before rate scaling.
    pub onset_offset_secs: f64,
    /// Multiplier applied to every duration.
    pub rate_ratio: f64,
}

impl CorrectionPolicy {
    /// Penn Phonetics Lab forced aligner on HTK: 12.5 ms onset latency and
    /// an 11000 Hz internal clock for 11025 Hz audio.
    pub const P2FA: Self = Self {
        onset_offset_secs: ONSET_OFFSET_SECS,
        rate_ratio: DECODER_CLOCK_HZ / DECODER_NOMINAL_HZ,
    };

    /// No offset and no scaling; only end reconciliation applies.
    pub const IDENTITY: Self = Self {
        onset_offset_secs: 0.0,
        rate_ratio: 1.0,
    };
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self::P2FA
    }
}

/// Apply offset, rate correction and end reconciliation to raw durations.
pub fn corrected_durations(
    raw: &[f64],
    true_duration: f64,
    policy: &CorrectionPolicy,
) -> Result<Vec<f64>> {
    if !true_duration.is_finite() || true_duration <= 0.0 {
        return Err(AlignError::correction(format!(
            "audio duration must be positive, got {true_duration}"
        )));
    }
    let Some(last) = raw.len().checked_sub(1) else {
        return Err(AlignError::correction(
            "decoder produced no phoneme segments",
        ));
    };

    let mut durations = raw.to_vec();
    durations[0] += policy.onset_offset_secs;
    for duration in durations.iter_mut() {
        *duration *= policy.rate_ratio;
    }
    durations[last] = true_duration - durations[..last].iter().sum::<f64>();

    if let Some((index, value)) = durations
        .iter()
        .enumerate()
        .find(|(_, d)| !d.is_finite() || **d < 0.0)
    {
        return Err(AlignError::correction(format!(
            "corrected duration of phoneme {index} is {value} (audio is {true_duration}s, {} phonemes)",
            durations.len()
        )));
    }

    Ok(durations)
}

/// Correct a raw decoder alignment so it covers `[0, true_duration]`.
pub fn correct(
    raw: &Alignment,
    true_duration: f64,
    policy: &CorrectionPolicy,
) -> Result<Alignment> {
    let durations = corrected_durations(&raw.durations(), true_duration, policy)?;
    let corrected = raw.with_durations(&durations)?;
    tracing::debug!(
        phonemes = durations.len(),
        raw_end = raw.end(),
        corrected_end = corrected.end(),
        "corrected alignment"
    );
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{PhonemeSegment, Word};

    const K: f64 = 11000.0 / 11025.0;

    fn raw_alignment(durations: &[f64]) -> Alignment {
        let mut t = 0.0;
        let phonemes = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let p = PhonemeSegment::new(format!("P{i}"), t, t + d);
                t += d;
                p
            })
            .collect();
        Alignment::new(vec![Word::new("W", phonemes)])
    }

    #[test]
    fn test_p2fa_constants() {
        assert_eq!(CorrectionPolicy::P2FA.onset_offset_secs, 0.0125);
        assert_eq!(CorrectionPolicy::P2FA.rate_ratio, K);
        assert_eq!(CorrectionPolicy::default(), CorrectionPolicy::P2FA);
    }

    #[test]
    fn test_correction_order() {
        let (d0, d1, d2) = (0.3, 0.2, 0.4);
        let total = 1.0;
        let durations =
            corrected_durations(&[d0, d1, d2], total, &CorrectionPolicy::P2FA).unwrap();

        let expected0 = (d0 + 0.0125) * K;
        let expected1 = d1 * K;
        assert_eq!(durations[0], expected0);
        assert_eq!(durations[1], expected1);
        assert_eq!(durations[2], total - (expected0 + expected1));
    }

    #[test]
    fn test_middle_phonemes_only_scaled() {
        let raw = [0.1, 0.2, 0.3, 0.4, 0.5];
        let durations = corrected_durations(&raw, 2.0, &CorrectionPolicy::P2FA).unwrap();
        for i in 1..4 {
            assert_eq!(durations[i], raw[i] * K);
        }
    }

    #[test]
    fn test_single_segment_spans_whole_audio() {
        for raw in [0.0, 0.01, 1.7, 50.0] {
            let alignment = correct(&raw_alignment(&[raw]), 2.5, &CorrectionPolicy::P2FA).unwrap();
            let phonemes: Vec<_> = alignment.phonemes().collect();
            assert_eq!(phonemes.len(), 1);
            assert_eq!(phonemes[0].start, 0.0);
            assert_eq!(phonemes[0].end, 2.5);
        }
    }

    #[test]
    fn test_coverage_and_contiguity() {
        let raw = raw_alignment(&[0.05, 0.11, 0.0, 0.23, 0.07, 0.31, 0.12]);
        let total = 0.93;
        let corrected = correct(&raw, total, &CorrectionPolicy::P2FA).unwrap();
        let phonemes: Vec<_> = corrected.phonemes().collect();

        assert_eq!(phonemes[0].start, 0.0);
        for pair in phonemes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        let sum: f64 = phonemes.iter().map(|p| p.duration()).sum();
        assert!((sum - total).abs() < 1e-6);
        assert!((corrected.end() - total).abs() < 1e-6);
        assert!(phonemes.iter().all(|p| p.duration() >= 0.0));
    }

    #[test]
    fn test_labels_and_words_preserved() {
        let raw = raw_alignment(&[0.1, 0.2]);
        let corrected = correct(&raw, 0.5, &CorrectionPolicy::P2FA).unwrap();
        assert_eq!(corrected.words.len(), 1);
        assert_eq!(corrected.words[0].label, "W");
        let labels: Vec<_> = corrected.phonemes().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["P0", "P1"]);
    }

    #[test]
    fn test_identity_policy_only_reconciles_end() {
        let durations =
            corrected_durations(&[0.25, 0.5, 0.1], 1.0, &CorrectionPolicy::IDENTITY).unwrap();
        assert_eq!(durations, vec![0.25, 0.5, 0.25]);
    }

    #[test]
    fn test_empty_segments_is_error() {
        let result = corrected_durations(&[], 1.0, &CorrectionPolicy::P2FA);
        match result {
            Err(AlignError::Correction { message }) => {
                assert!(message.contains("no phoneme segments"));
            }
            other => panic!("Expected Correction error, got {other:?}"),
        }
    }

    #[test]
    fn test_decoder_overrun_is_error_not_clamped() {
        // Raw durations already exceed the audio, leaving negative slack.
        let result = corrected_durations(&[0.6, 0.6, 0.1], 1.0, &CorrectionPolicy::P2FA);
        match result {
            Err(AlignError::Correction { message }) => {
                assert!(message.contains("phoneme 2"), "{message}");
            }
            other => panic!("Expected Correction error, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_raw_duration_is_error() {
        let result = corrected_durations(&[0.1, -0.05, 0.1], 1.0, &CorrectionPolicy::P2FA);
        assert!(matches!(result, Err(AlignError::Correction { .. })));
    }

    #[test]
    fn test_non_positive_duration_is_error() {
        for total in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = corrected_durations(&[0.1], total, &CorrectionPolicy::P2FA);
            assert!(matches!(result, Err(AlignError::Correction { .. })), "{total}");
        }
    }
}
