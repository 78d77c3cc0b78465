//! Default configuration constants for p2fa.
//!
//! Values here are shared between the configuration types, the HTK decoder
//! and the CLI so that a single number never drifts between call sites.

use std::time::Duration;

/// Sample rate the P2FA acoustic models were trained at, in Hz.
///
/// Audio is resampled to this rate before feature extraction.
pub const DECODER_SAMPLE_RATE: u32 = 11025;

/// Additive correction for the first phoneme, in seconds.
///
/// Compensates the analysis-window latency of the HCopy front end at
/// utterance start. Measured for the P2FA models only.
pub const ONSET_OFFSET_SECS: f64 = 0.0125;

/// Numerator of the rate correction ratio.
///
/// HVite's internal clock runs at 11000 Hz while the audio is 11025 Hz.
pub const DECODER_CLOCK_HZ: f64 = 11000.0;

/// Denominator of the rate correction ratio.
pub const DECODER_NOMINAL_HZ: f64 = 11025.0;

/// Time unit of HTK label files (100 ns) expressed in seconds.
pub const HTK_TIME_UNIT_SECS: f64 = 1e-7;

/// Label used by the decoder for short pauses between words.
pub const SILENCE_LABEL: &str = "sp";

/// Default HTK feature extraction binary.
pub const HCOPY_BINARY: &str = "HCopy";

/// Default HTK Viterbi decoder binary.
pub const HVITE_BINARY: &str = "HVite";

/// HVite word insertion log probability (`-p`).
pub const WORD_INSERTION_PENALTY: &str = "0.";

/// HVite grammar scale factor (`-s`).
pub const GRAMMAR_SCALE: &str = "5.";

/// Default wall-clock limit for a single decoder subprocess.
///
/// HTK gives no progress signal, so a hung decoder can only be detected by
/// elapsed time.
pub const DECODER_TIMEOUT: Duration = Duration::from_secs(300);

/// Largest accepted decoder timeout (one week).
pub const MAX_DECODER_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default number of batch workers: all available parallel execution units.
pub fn worker_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
