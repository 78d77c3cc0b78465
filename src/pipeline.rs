//! Single-utterance alignment: normalize → pronounce → decode → correct.

use crate::alignment::Alignment;
use crate::audio::AudioBuffer;
use crate::correction;
use crate::decoder::{Decoder, DecoderJob, mlf};
use crate::error::{AlignError, Result};
use crate::g2p::Phonemizer;
use crate::pronunciation::PronunciationBuilder;
use crate::text::Normalizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

const WORKSPACE_PREFIX: &str = "p2fa-";

/// A transcript and its recording.
///
/// The duration is always derived from the samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    text: String,
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Utterance {
    pub fn new(text: impl Into<String>, samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AlignError::invalid_input("transcript is empty"));
        }
        if samples.is_empty() {
            return Err(AlignError::invalid_input("audio has no samples"));
        }
        if sample_rate == 0 {
            return Err(AlignError::invalid_input("audio sample rate is zero"));
        }
        Ok(Self {
            text,
            samples,
            sample_rate,
        })
    }

    /// Load a UTF-8 transcript and a WAV recording.
    pub fn from_files(text_path: &Path, audio_path: &Path) -> Result<Self> {
        let text = load_text(text_path)?;
        let audio = AudioBuffer::load(audio_path)?;
        Self::new(text, audio.samples, audio.sample_rate)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Seconds of audio.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Read a transcript file as UTF-8.
pub fn load_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| {
        AlignError::invalid_input(format!("{} is not valid UTF-8: {e}", path.display()))
    })
}

/// The full alignment pipeline with its collaborators.
///
/// Built once and shared by reference across batch workers; every call
/// gets its own temporary workspace.
pub struct Aligner {
    normalizer: Normalizer,
    phonemizer: Arc<dyn Phonemizer>,
    decoder: Arc<dyn Decoder>,
    workspace_root: Option<PathBuf>,
}

impl Aligner {
    /// Aligner with English normalization and system temporary workspaces.
    pub fn new(phonemizer: Arc<dyn Phonemizer>, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            normalizer: Normalizer::english(),
            phonemizer,
            decoder,
            workspace_root: None,
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Create per-call workspaces under `root` instead of the system
    /// temporary directory.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }

    /// Align raw text against mono samples.
    pub fn align(&self, text: &str, samples: &[f32], sample_rate: u32) -> Result<Alignment> {
        let utterance = Utterance::new(text, samples.to_vec(), sample_rate)?;
        self.align_utterance(&utterance)
    }

    pub fn align_utterance(&self, utterance: &Utterance) -> Result<Alignment> {
        let started = Instant::now();

        let words = self.normalizer.words(utterance.text());
        if words.is_empty() {
            return Err(AlignError::invalid_input(
                "transcript has no words after normalization",
            ));
        }

        let pronunciations = PronunciationBuilder::new(self.phonemizer.as_ref()).build(&words)?;

        let workspace = self.create_workspace()?;
        let job = DecoderJob::materialize(
            workspace.path(),
            utterance.samples(),
            utterance.sample_rate(),
            self.decoder.sample_rate(),
            &pronunciations,
        )?;

        let output = self.decoder.decode(&job)?;
        let raw = mlf::read(&output)?;
        let alignment = correction::correct(
            &raw,
            utterance.duration(),
            &self.decoder.correction_policy(),
        )?;

        tracing::info!(
            decoder = self.decoder.name(),
            words = pronunciations.word_count(),
            phonemes = alignment.phoneme_count(),
            gaps = pronunciations.gaps.len(),
            duration_secs = utterance.duration(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aligned utterance"
        );
        Ok(alignment)
    }

    /// Align a transcript file against a WAV file.
    pub fn align_files(&self, text_path: &Path, audio_path: &Path) -> Result<Alignment> {
        self.align_utterance(&Utterance::from_files(text_path, audio_path)?)
    }

    /// Align and save to `output_path` in the format its extension names.
    pub fn align_file_to_file(
        &self,
        text_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<Alignment> {
        // Fail on an unusable extension before spending time in the decoder.
        crate::alignment::AlignmentFormat::from_path(output_path)?;
        let alignment = self.align_files(text_path, audio_path)?;
        alignment.save(output_path)?;
        Ok(alignment)
    }

    fn create_workspace(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let workspace = match &self.workspace_root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_pcm16;
    use crate::correction::CorrectionPolicy;
    use crate::decoder::ScriptedDecoder;
    use crate::g2p::LexiconPhonemizer;

    fn lexicon() -> Arc<dyn Phonemizer> {
        Arc::new(LexiconPhonemizer::from_entries([
            ("THE", vec!["DH", "AH0"]),
            ("CAT", vec!["K", "AE1", "T"]),
            ("SAT", vec!["S", "AE1", "T"]),
            ("TWENTY", vec!["T", "W", "EH1", "N", "T", "IY0"]),
            ("ONE", vec!["W", "AH1", "N"]),
        ]))
    }

    fn aligner(decoder: ScriptedDecoder, root: &Path) -> Aligner {
        Aligner::new(lexicon(), Arc::new(decoder)).with_workspace_root(root)
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path).unwrap().next().is_none()
    }

    #[test]
    fn test_utterance_validation() {
        assert!(Utterance::new("hi", vec![0.0; 10], 16000).is_ok());
        for (text, samples, rate) in [
            ("  ", vec![0.0; 10], 16000),
            ("hi", vec![], 16000),
            ("hi", vec![0.0; 10], 0),
        ] {
            assert!(matches!(
                Utterance::new(text, samples, rate),
                Err(AlignError::InvalidInput { .. })
            ));
        }
    }

    #[test]
    fn test_utterance_duration_is_derived() {
        let utterance = Utterance::new("hi", vec![0.0; 24000], 16000).unwrap();
        assert!((utterance.duration() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_align_covers_audio_duration() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.05), root.path());

        let alignment = aligner
            .align("The cat sat.", &vec![0.0; 16000], 16000)
            .unwrap();

        let labels: Vec<&str> = alignment.words.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["sp", "THE", "sp", "CAT", "sp", "SAT", "sp"]);

        let phonemes: Vec<_> = alignment.phonemes().collect();
        assert_eq!(phonemes[0].start, 0.0);
        for pair in phonemes.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        assert!((alignment.end() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_align_applies_decoder_policy() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(
            ScriptedDecoder::uniform(0.1).with_policy(CorrectionPolicy::IDENTITY),
            root.path(),
        );

        let alignment = aligner.align("cat", &vec![0.0; 11025], 11025).unwrap();
        let durations = alignment.durations();
        // sp, K, AE1, T, sp: the final pause absorbs the remainder.
        assert_eq!(durations.len(), 5);
        assert!((durations[1] - 0.1).abs() < 1e-9);
        assert!((durations[4] - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_numbers_are_expanded_before_lookup() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.01), root.path());

        let alignment = aligner.align("21", &vec![0.0; 8000], 8000).unwrap();
        let labels: Vec<&str> = alignment
            .words
            .iter()
            .map(|w| w.label.as_str())
            .filter(|l| *l != "sp")
            .collect();
        assert_eq!(labels, vec!["TWENTY", "ONE"]);
    }

    #[test]
    fn test_punctuation_only_transcript_is_input_error() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.01), root.path());

        let result = aligner.align("?!", &vec![0.0; 100], 8000);
        assert!(matches!(result, Err(AlignError::InvalidInput { .. })));
    }

    #[test]
    fn test_workspace_removed_after_success() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.01), root.path());

        aligner.align("the cat", &vec![0.0; 8000], 8000).unwrap();
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn test_workspace_removed_after_decoder_failure() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.01).failing_on("CAT"), root.path());

        let result = aligner.align("the cat", &vec![0.0; 8000], 8000);
        assert!(matches!(result, Err(AlignError::DecoderFailed { .. })));
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn test_workspace_removed_after_correction_failure() {
        let root = tempfile::tempdir().unwrap();
        // Raw alignment longer than the audio leaves no room for the last phoneme.
        let aligner = aligner(
            ScriptedDecoder::fixed("#!MLF!#\n0 15000000 K -1 CAT\n15000000 16000000 T -1\n.\n"),
            root.path(),
        );

        let result = aligner.align("cat", &vec![0.0; 8000], 8000);
        assert!(matches!(result, Err(AlignError::Correction { .. })));
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn test_header_only_output_is_correction_error() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::fixed("#!MLF!#\n.\n"), root.path());

        let result = aligner.align("cat", &vec![0.0; 8000], 8000);
        assert!(matches!(result, Err(AlignError::Correction { .. })));
    }

    #[test]
    fn test_align_file_to_file_writes_json() {
        let root = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let text = data.path().join("a.txt");
        let audio = data.path().join("a.wav");
        let output = data.path().join("out").join("a.json");
        std::fs::write(&text, "The cat.\n").unwrap();
        write_pcm16(&audio, &vec![0.0; 16000], 16000).unwrap();

        let aligner = aligner(ScriptedDecoder::uniform(0.02), root.path());
        let alignment = aligner.align_file_to_file(&text, &audio, &output).unwrap();

        assert_eq!(Alignment::load(&output).unwrap(), alignment);
        assert!(is_empty_dir(root.path()));
    }

    #[test]
    fn test_align_file_to_file_rejects_unknown_extension_early() {
        let root = tempfile::tempdir().unwrap();
        let aligner = aligner(ScriptedDecoder::uniform(0.02), root.path());

        let result = aligner.align_file_to_file(
            Path::new("/nonexistent/a.txt"),
            Path::new("/nonexistent/a.wav"),
            Path::new("out.csv"),
        );
        assert!(matches!(result, Err(AlignError::AlignmentFormat { .. })));
    }

    #[test]
    fn test_load_text_rejects_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [0xff, 0xfe, 0x41]).unwrap();
        assert!(matches!(
            load_text(&path),
            Err(AlignError::InvalidInput { .. })
        ));
    }
}
