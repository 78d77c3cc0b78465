//! Forced-alignment decoders.
//!
//! A [`Decoder`] turns a materialized [`DecoderJob`] (audio, dictionary and
//! word sequence in a private workspace) into a raw phoneme-level MLF file.
//! Each decoder also carries the [`CorrectionPolicy`] its timings need.

pub mod command;
pub mod htk;
pub mod job;
pub mod mlf;
pub mod scripted;

pub use command::{CommandExecutor, SystemCommandExecutor};
pub use htk::{HtkDecoder, HtkModel};
pub use job::DecoderJob;
pub use scripted::ScriptedDecoder;

use crate::correction::CorrectionPolicy;
use crate::error::{AlignError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trait for forced-alignment backends.
///
/// Implementations must be usable from many batch workers at once; all
/// per-utterance state lives in the [`DecoderJob`] workspace.
pub trait Decoder: Send + Sync {
    /// Align the job's word sequence against its audio.
    ///
    /// Returns the path of a non-empty MLF file inside the job workspace.
    fn decode(&self, job: &DecoderJob) -> Result<PathBuf>;

    /// Sample rate the decoder's acoustic models expect.
    fn sample_rate(&self) -> u32;

    /// Timing correction matched to this decoder's front end.
    fn correction_policy(&self) -> CorrectionPolicy;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Implement Decoder for Arc<T> to allow sharing across workers.
impl<T: Decoder + ?Sized> Decoder for Arc<T> {
    fn decode(&self, job: &DecoderJob) -> Result<PathBuf> {
        (**self).decode(job)
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn correction_policy(&self) -> CorrectionPolicy {
        (**self).correction_policy()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fail unless `path` exists and is non-empty.
///
/// HTK tools can exit 0 without writing their output file when every
/// utterance in the script is rejected.
pub(crate) fn require_output(path: &Path, tool: &str) -> Result<PathBuf> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(path.to_path_buf()),
        Ok(_) => Err(AlignError::DecoderFailed {
            tool: tool.to_string(),
            message: format!("alignment output {} is empty", path.display()),
        }),
        Err(_) => Err(AlignError::DecoderFailed {
            tool: tool.to_string(),
            message: format!("no alignment output written to {}", path.display()),
        }),
    }
}
