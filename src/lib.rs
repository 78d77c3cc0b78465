//! p2fa - Phoneme-level forced alignment
//!
//! Normalizes a transcript, builds a pronunciation dictionary, runs the HTK
//! P2FA aligner on the audio and corrects its timings so the phonemes tile
//! the recording exactly.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod alignment;
#[cfg(feature = "cli")]
pub mod app;
pub mod audio;
pub mod batch;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod correction;
pub mod decoder;
pub mod defaults;
pub mod error;
pub mod evaluate;
pub mod g2p;
pub mod pipeline;
pub mod pronunciation;
pub mod sys;
pub mod text;

// Core traits (phonemizer → decoder → subprocess)
pub use decoder::{CommandExecutor, Decoder, SystemCommandExecutor};
pub use g2p::Phonemizer;
pub use text::NumberExpander;

// Pipeline
pub use pipeline::{Aligner, Utterance};

// Batch
pub use batch::{BatchItem, BatchReport, ItemOutcome, ItemStatus, run_batch, run_batch_with};

// Alignment types
pub use alignment::{Alignment, AlignmentFormat, PhonemeSegment, Word};
pub use correction::CorrectionPolicy;

// Error handling
pub use error::{AlignError, FailureCategory, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
