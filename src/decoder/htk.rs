//! HTK-based decoder: HCopy feature extraction followed by HVite alignment.

use super::command::{CommandExecutor, SystemCommandExecutor};
use super::job::DecoderJob;
use super::{Decoder, require_output};
use crate::correction::CorrectionPolicy;
use crate::defaults::{DECODER_SAMPLE_RATE, GRAMMAR_SCALE, WORD_INSERTION_PENALTY};
use crate::error::{AlignError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Files of a trained P2FA acoustic model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtkModel {
    /// HCopy front-end configuration.
    pub config: PathBuf,
    pub macros: PathBuf,
    pub hmmdefs: PathBuf,
    /// Phone list HVite loads models for.
    pub monophones: PathBuf,
}

impl HtkModel {
    const FILES: [&'static str; 4] = ["config", "macros", "hmmdefs", "monophones"];

    /// Resolve and check the model files inside `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let missing: Vec<&str> = Self::FILES
            .iter()
            .copied()
            .filter(|name| !dir.join(name).is_file())
            .collect();
        if !missing.is_empty() {
            return Err(AlignError::ConfigInvalidValue {
                key: "decoder.model_dir".to_string(),
                message: format!("{} is missing {}", dir.display(), missing.join(", ")),
            });
        }
        Ok(Self {
            config: dir.join("config"),
            macros: dir.join("macros"),
            hmmdefs: dir.join("hmmdefs"),
            monophones: dir.join("monophones"),
        })
    }
}

/// Forced aligner driving the HTK command-line tools.
pub struct HtkDecoder<E: CommandExecutor = SystemCommandExecutor> {
    model: HtkModel,
    hcopy: PathBuf,
    hvite: PathBuf,
    executor: E,
}

impl HtkDecoder<SystemCommandExecutor> {
    /// Decoder running the real tools with a per-tool time limit.
    pub fn new(
        model_dir: &Path,
        hcopy: impl Into<PathBuf>,
        hvite: impl Into<PathBuf>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self::with_executor(
            HtkModel::from_dir(model_dir)?,
            hcopy,
            hvite,
            SystemCommandExecutor::new(timeout),
        ))
    }
}

impl<E: CommandExecutor> HtkDecoder<E> {
    pub fn with_executor(
        model: HtkModel,
        hcopy: impl Into<PathBuf>,
        hvite: impl Into<PathBuf>,
        executor: E,
    ) -> Self {
        Self {
            model,
            hcopy: hcopy.into(),
            hvite: hvite.into(),
            executor,
        }
    }

    pub fn model(&self) -> &HtkModel {
        &self.model
    }

    fn hcopy_args(&self, job: &DecoderJob) -> Vec<OsString> {
        vec![
            "-T".into(),
            "1".into(),
            "-C".into(),
            self.model.config.clone().into(),
            "-S".into(),
            job.code_script.clone().into(),
        ]
    }

    fn hvite_args(&self, job: &DecoderJob) -> Vec<OsString> {
        vec![
            "-T".into(),
            "1".into(),
            "-a".into(),
            "-m".into(),
            "-I".into(),
            job.word_sequence.clone().into(),
            "-H".into(),
            self.model.macros.clone().into(),
            "-H".into(),
            self.model.hmmdefs.clone().into(),
            "-S".into(),
            job.script.clone().into(),
            "-i".into(),
            job.output.clone().into(),
            "-p".into(),
            WORD_INSERTION_PENALTY.into(),
            "-s".into(),
            GRAMMAR_SCALE.into(),
            job.dictionary.clone().into(),
            self.model.monophones.clone().into(),
        ]
    }
}

impl<E: CommandExecutor> Decoder for HtkDecoder<E> {
    fn decode(&self, job: &DecoderJob) -> Result<PathBuf> {
        self.executor
            .execute(&self.hcopy, &self.hcopy_args(job), &job.feature_log)?;
        self.executor
            .execute(&self.hvite, &self.hvite_args(job), &job.log)?;
        require_output(&job.output, "HVite")
    }

    fn sample_rate(&self) -> u32 {
        DECODER_SAMPLE_RATE
    }

    fn correction_policy(&self) -> CorrectionPolicy {
        CorrectionPolicy::P2FA
    }

    fn name(&self) -> &str {
        "htk"
    }
}
