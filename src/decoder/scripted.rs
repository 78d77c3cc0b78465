//! Deterministic in-process decoder for tests and dry runs.
//!
//! Honors the same contract as the HTK decoder (reads the job's dictionary
//! and word sequence, writes an MLF into the workspace) without any external
//! tools.

use super::job::DecoderJob;
use super::{Decoder, require_output};
use crate::correction::CorrectionPolicy;
use crate::defaults::{DECODER_SAMPLE_RATE, HTK_TIME_UNIT_SECS, SILENCE_LABEL};
use crate::error::{AlignError, Result};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone)]
enum Script {
    /// Every phoneme gets the same duration; pauses get none.
    Uniform { phoneme_units: i64 },
    /// The same MLF text for every job.
    Fixed(String),
}

/// Decoder that fabricates alignments from the job inputs.
#[derive(Debug, Clone)]
pub struct ScriptedDecoder {
    script: Script,
    fail_on: Option<String>,
    policy: CorrectionPolicy,
}

impl ScriptedDecoder {
    /// Give each phoneme `phoneme_secs` of raw decoder time.
    pub fn uniform(phoneme_secs: f64) -> Self {
        Self::with_script(Script::Uniform {
            phoneme_units: (phoneme_secs / HTK_TIME_UNIT_SECS).round() as i64,
        })
    }

    /// Always emit `mlf`, regardless of the job.
    pub fn fixed(mlf: impl Into<String>) -> Self {
        Self::with_script(Script::Fixed(mlf.into()))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            fail_on: None,
            policy: CorrectionPolicy::P2FA,
        }
    }

    /// Fail any job whose word sequence contains `word`.
    pub fn failing_on(mut self, word: impl Into<String>) -> Self {
        self.fail_on = Some(word.into());
        self
    }

    pub fn with_policy(mut self, policy: CorrectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn render(&self, words: &[String], dictionary: &HashMap<String, Vec<String>>) -> String {
        let phoneme_units = match &self.script {
            Script::Fixed(mlf) => return mlf.clone(),
            Script::Uniform { phoneme_units } => *phoneme_units,
        };

        let mut out = String::from("#!MLF!#\n\"*/tmp.rec\"\n");
        let mut t = 0i64;
        for word in words {
            if word == SILENCE_LABEL {
                out.push_str(&format!("{t} {t} {SILENCE_LABEL} 0.0 {SILENCE_LABEL}\n"));
                continue;
            }
            let phonemes = dictionary.get(word).map(Vec::as_slice).unwrap_or_default();
            for (i, phoneme) in phonemes.iter().enumerate() {
                let end = t + phoneme_units;
                if i == 0 {
                    out.push_str(&format!("{t} {end} {phoneme} -1.0 {word}\n"));
                } else {
                    out.push_str(&format!("{t} {end} {phoneme} -1.0\n"));
                }
                t = end;
            }
        }
        out.push_str(".\n");
        out
    }
}

impl Decoder for ScriptedDecoder {
    fn decode(&self, job: &DecoderJob) -> Result<PathBuf> {
        let words = read_word_sequence(&std::fs::read_to_string(&job.word_sequence)?);
        let dictionary = read_dictionary(&std::fs::read_to_string(&job.dictionary)?);

        if let Some(word) = &self.fail_on
            && words.contains(word)
        {
            std::fs::write(&job.log, format!("ERROR: cannot align {word}\n"))?;
            return Err(AlignError::DecoderFailed {
                tool: self.name().to_string(),
                message: format!("cannot align {word}"),
            });
        }

        std::fs::write(&job.log, format!("aligned {} labels\n", words.len()))?;
        std::fs::write(&job.output, self.render(&words, &dictionary))?;
        require_output(&job.output, self.name())
    }

    fn sample_rate(&self) -> u32 {
        DECODER_SAMPLE_RATE
    }

    fn correction_policy(&self) -> CorrectionPolicy {
        self.policy
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn read_word_sequence(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "#!MLF!#" && *l != "." && !l.starts_with('"'))
        .map(str::to_string)
        .collect()
}

fn read_dictionary(contents: &str) -> HashMap<String, Vec<String>> {
    contents
        .lines()
        .filter_map(|line| line.split_once("  "))
        .map(|(word, phonemes)| {
            (
                word.to_string(),
                phonemes.split_whitespace().map(str::to_string).collect(),
            )
        })
        .collect()
}
