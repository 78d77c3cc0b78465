//! Per-utterance decoder workspace layout.

use crate::audio::{resample, write_pcm16};
use crate::error::{AlignError, Result};
use crate::pronunciation::Pronunciations;
use std::path::{Path, PathBuf};

/// Paths of every artifact one decoding run reads or writes.
///
/// All paths live directly inside `workspace`, which is owned by exactly one
/// alignment call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderJob {
    pub workspace: PathBuf,
    /// Resampled 16-bit mono audio.
    pub audio: PathBuf,
    /// HCopy script: `<audio> <features>`.
    pub code_script: PathBuf,
    /// Extracted acoustic features.
    pub features: PathBuf,
    /// HVite script listing the feature file.
    pub script: PathBuf,
    pub dictionary: PathBuf,
    /// Word-level MLF the decoder aligns against.
    pub word_sequence: PathBuf,
    /// Phoneme-level MLF written by the decoder.
    pub output: PathBuf,
    /// Decoder stdout/stderr.
    pub log: PathBuf,
    /// Feature extraction stdout/stderr.
    pub feature_log: PathBuf,
}

impl DecoderJob {
    /// Lay out a job inside `workspace` without touching the filesystem.
    pub fn in_workspace(workspace: &Path) -> Self {
        Self {
            workspace: workspace.to_path_buf(),
            audio: workspace.join("sound.wav"),
            code_script: workspace.join("codetr.scp"),
            features: workspace.join("tmp.plp"),
            script: workspace.join("test.scp"),
            dictionary: workspace.join("dictionary"),
            word_sequence: workspace.join("tmp.mlf"),
            output: workspace.join("alignment.mlf"),
            log: workspace.join("aligned.results"),
            feature_log: workspace.join("features.log"),
        }
    }

    /// Write every decoder input into `workspace`.
    ///
    /// `samples` at `sample_rate` are resampled to `decoder_rate` first.
    /// HTK script files split on whitespace, so the workspace path must not
    /// contain any.
    pub fn materialize(
        workspace: &Path,
        samples: &[f32],
        sample_rate: u32,
        decoder_rate: u32,
        pronunciations: &Pronunciations,
    ) -> Result<Self> {
        if workspace.to_string_lossy().chars().any(char::is_whitespace) {
            return Err(AlignError::ConfigInvalidValue {
                key: "batch.workspace_root".to_string(),
                message: format!(
                    "workspace path {} contains whitespace, which HTK script files cannot express",
                    workspace.display()
                ),
            });
        }

        let job = Self::in_workspace(workspace);

        let audio = resample(samples, sample_rate, decoder_rate);
        write_pcm16(&job.audio, &audio, decoder_rate)?;

        std::fs::write(
            &job.code_script,
            format!("{} {}\n", job.audio.display(), job.features.display()),
        )?;
        std::fs::write(&job.script, format!("{}\n", job.features.display()))?;
        std::fs::write(&job.dictionary, pronunciations.dictionary_file())?;
        std::fs::write(&job.word_sequence, pronunciations.word_sequence_file())?;

        tracing::trace!(
            workspace = %workspace.display(),
            input_rate = sample_rate,
            decoder_rate,
            samples = audio.len(),
            "materialized decoder job"
        );
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioBuffer;
    use crate::g2p::LexiconPhonemizer;
    use crate::pronunciation::PronunciationBuilder;

    fn pronunciations() -> Pronunciations {
        let lex = LexiconPhonemizer::from_entries([("HI", vec!["HH", "AY1"])]);
        PronunciationBuilder::new(&lex)
            .build(&["HI".to_string()])
            .unwrap()
    }

    #[test]
    fn test_layout_uses_fixed_names() {
        let job = DecoderJob::in_workspace(Path::new("/tmp/ws"));
        assert_eq!(job.audio, Path::new("/tmp/ws/sound.wav"));
        assert_eq!(job.features, Path::new("/tmp/ws/tmp.plp"));
        assert_eq!(job.word_sequence, Path::new("/tmp/ws/tmp.mlf"));
        assert_eq!(job.output, Path::new("/tmp/ws/alignment.mlf"));
        assert_eq!(job.log, Path::new("/tmp/ws/aligned.results"));
    }

    #[test]
    fn test_materialize_writes_all_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let samples = vec![0.0f32; 16000];
        let job =
            DecoderJob::materialize(dir.path(), &samples, 16000, 11025, &pronunciations()).unwrap();

        let audio = AudioBuffer::load(&job.audio).unwrap();
        assert_eq!(audio.sample_rate, 11025);
        assert_eq!(audio.samples.len(), 11025);

        let code = std::fs::read_to_string(&job.code_script).unwrap();
        assert!(code.contains("sound.wav"));
        assert!(code.trim_end().ends_with("tmp.plp"));

        let script = std::fs::read_to_string(&job.script).unwrap();
        assert_eq!(script, format!("{}\n", job.features.display()));

        assert_eq!(
            std::fs::read_to_string(&job.dictionary).unwrap(),
            "HI  HH AY1\nsp  sp\n"
        );
        assert!(
            std::fs::read_to_string(&job.word_sequence)
                .unwrap()
                .contains("\nsp\nHI\nsp\n")
        );
        assert!(!job.output.exists());
    }

    #[test]
    fn test_materialize_rejects_whitespace_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = dir.path().join("with space");
        std::fs::create_dir(&workspace).unwrap();

        let result = DecoderJob::materialize(&workspace, &[0.0], 11025, 11025, &pronunciations());
        assert!(matches!(
            result,
            Err(AlignError::ConfigInvalidValue { .. })
        ));
    }
}
