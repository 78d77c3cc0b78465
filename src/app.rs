//! Alignment application entry points.
//!
//! Builds the aligner from configuration and runs the CLI commands:
//! config → phonemizer + decoder → aligner → align / batch

use crate::alignment::Alignment;
use crate::batch::{BatchItem, BatchReport, ItemStatus, run_batch_with};
use crate::config::Config;
use crate::decoder::HtkDecoder;
use crate::defaults::worker_count;
use crate::error::{AlignError, Result};
use crate::evaluate::{DurationMetrics, Evaluation};
use crate::g2p::LexiconPhonemizer;
use crate::pipeline::{Aligner, load_text};
use crate::pronunciation::PronunciationBuilder;
use crate::text::Normalizer;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

/// Pronouncing dictionary shipped inside P2FA model directories.
const MODEL_DICTIONARY: &str = "dict";

/// Load the configured lexicon, falling back to `<model_dir>/dict`.
pub fn load_phonemizer(config: &Config) -> Result<LexiconPhonemizer> {
    let path = match (&config.lexicon.path, &config.decoder.model_dir) {
        (Some(path), _) => path.clone(),
        (None, Some(model_dir)) if model_dir.join(MODEL_DICTIONARY).is_file() => {
            model_dir.join(MODEL_DICTIONARY)
        }
        _ => {
            return Err(AlignError::ConfigInvalidValue {
                key: "lexicon.path".to_string(),
                message: "no pronouncing dictionary configured \
                          (use --lexicon, P2FA_LEXICON or [lexicon] path)"
                    .to_string(),
            });
        }
    };
    LexiconPhonemizer::load(&path)
}

/// Build the HTK-backed aligner described by `config`.
pub fn build_aligner(config: &Config) -> Result<Aligner> {
    config.validate()?;
    let model_dir = config
        .decoder
        .model_dir
        .as_deref()
        .ok_or_else(|| AlignError::ConfigInvalidValue {
            key: "decoder.model_dir".to_string(),
            message: "no model directory configured (use --model-dir, P2FA_MODEL_DIR or [decoder] model_dir)"
                .to_string(),
        })?;

    let decoder = HtkDecoder::new(
        model_dir,
        &config.decoder.hcopy,
        &config.decoder.hvite,
        Some(config.decoder.timeout()),
    )?;
    let phonemizer = load_phonemizer(config)?;

    let mut aligner = Aligner::new(Arc::new(phonemizer), Arc::new(decoder));
    if let Some(root) = &config.batch.workspace_root {
        aligner = aligner.with_workspace_root(root);
    }
    Ok(aligner)
}

/// Align one file pair and save the result.
pub fn run_align(config: &Config, text: &Path, audio: &Path, output: &Path, quiet: bool) -> Result<()> {
    let aligner = build_aligner(config)?;
    let alignment = aligner.align_file_to_file(text, audio, output)?;
    if !quiet {
        println!(
            "{} {} phonemes, {:.3}s → {}",
            "Aligned".green(),
            alignment.phoneme_count(),
            alignment.end(),
            output.display()
        );
    }
    Ok(())
}

/// Run a batch with a progress bar on interactive terminals.
pub fn run_batch_command(
    config: &Config,
    items: Vec<BatchItem>,
    workers: Option<usize>,
    quiet: bool,
) -> Result<BatchReport> {
    if items.is_empty() {
        return Err(AlignError::invalid_input("batch has no items"));
    }
    let aligner = build_aligner(config)?;
    let workers = workers
        .or(config.batch.workers)
        .unwrap_or_else(worker_count);

    let progress = (!quiet && std::io::stderr().is_terminal()).then(|| {
        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
        );
        pb
    });

    let report = run_batch_with(&aligner, items, workers, |outcome| {
        if let Some(pb) = &progress {
            pb.set_message(display_name(&outcome.item.audio));
            pb.inc(1);
        }
    });
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if !quiet {
        print_report(&report);
    }
    Ok(report)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &BatchReport) {
    for outcome in report.failures() {
        if let ItemStatus::Failed { category, message } = &outcome.status {
            eprintln!(
                "  {} #{} {} [{}] {}",
                "✗".red(),
                outcome.index,
                outcome.item.audio.display(),
                category,
                message
            );
        }
    }

    let summary = format!(
        "{}/{} aligned ({:.1}s of audio in {:.1?})",
        report.succeeded(),
        report.len(),
        report.aligned_secs(),
        report.elapsed
    );
    if report.all_succeeded() {
        println!("{} {}", "✓".green(), summary);
    } else {
        println!("{} {}", "!".yellow(), summary);
    }
}

/// Normalized, uppercase word sequence of `text`.
pub fn normalize_text(text: &str) -> String {
    Normalizer::english().words(text).join(" ")
}

/// Render the dictionary and word-sequence files the decoder would receive.
pub fn pronounce(config: &Config, text_path: &Path) -> Result<String> {
    let phonemizer = load_phonemizer(config)?;
    let words = Normalizer::english().words(&load_text(text_path)?);
    let pronunciations = PronunciationBuilder::new(&phonemizer).build(&words)?;

    let mut out = String::new();
    out.push_str("# dictionary\n");
    out.push_str(&pronunciations.dictionary_file());
    out.push_str("\n# word sequence\n");
    out.push_str(&pronunciations.word_sequence_file());
    if !pronunciations.gaps.is_empty() {
        out.push_str(&format!(
            "\n# no pronunciation: {}\n",
            pronunciations.gaps.join(" ")
        ));
    }
    Ok(out)
}

/// Compare alignment files, or directories of them matched by file name.
pub fn evaluate_paths(predicted: &Path, target: &Path) -> Result<Evaluation> {
    let pairs = if predicted.is_dir() {
        let mut pairs = Vec::new();
        for entry in std::fs::read_dir(predicted)? {
            let path = entry?.path();
            if path.extension().is_none_or(|e| e != "json") {
                continue;
            }
            let Some(name) = path.file_name() else {
                continue;
            };
            let reference = target.join(name);
            if !reference.is_file() {
                return Err(AlignError::invalid_input(format!(
                    "no reference alignment for {}",
                    path.display()
                )));
            }
            pairs.push((path, reference));
        }
        pairs.sort();
        pairs
    } else {
        vec![(predicted.to_path_buf(), target.to_path_buf())]
    };

    let mut metrics = DurationMetrics::new();
    for (p, t) in &pairs {
        metrics.update(&Alignment::load(p)?, &Alignment::load(t)?)?;
    }
    metrics
        .summary()
        .ok_or_else(|| AlignError::invalid_input("no phonemes to evaluate"))
}

pub fn format_evaluation(evaluation: &Evaluation) -> String {
    let mut lines = vec![
        format!("phonemes      {}", evaluation.phonemes),
        format!("l1            {:.6}", evaluation.l1),
    ];
    for level in &evaluation.accuracy {
        lines.push(format!("accuracy@{:<6}{:.4}", level.level, level.accuracy));
    }
    lines.join("\n")
}

/// Items from a manifest, or from paired audio/text directories.
pub fn collect_items(
    manifest: Option<&Path>,
    audio_dir: Option<&Path>,
    text_dir: Option<&Path>,
    output_dir: Option<&Path>,
    extension: &str,
) -> Result<Vec<BatchItem>> {
    match (manifest, audio_dir, text_dir, output_dir) {
        (Some(manifest), _, _, _) => BatchItem::read_manifest(manifest),
        (None, Some(audio), Some(text), Some(output)) => {
            BatchItem::pair_directory(audio, text, output, extension)
        }
        _ => Err(AlignError::invalid_input(
            "batch needs --manifest or --audio-dir, --text-dir and --output-dir",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{PhonemeSegment, Word};

    fn model_dir_with_dict() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config", "macros", "hmmdefs", "monophones"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::write(dir.path().join("dict"), "CAT  K AE1 T\nTHE  DH AH0\n").unwrap();
        dir
    }

    #[test]
    fn test_load_phonemizer_falls_back_to_model_dictionary() {
        let model = model_dir_with_dict();
        let mut config = Config::default();
        config.decoder.model_dir = Some(model.path().to_path_buf());

        let lexicon = load_phonemizer(&config).unwrap();
        assert_eq!(lexicon.len(), 2);
    }

    #[test]
    fn test_load_phonemizer_without_any_dictionary() {
        let result = load_phonemizer(&Config::default());
        assert!(matches!(
            result,
            Err(AlignError::ConfigInvalidValue { key, .. }) if key == "lexicon.path"
        ));
    }

    #[test]
    fn test_build_aligner_requires_model_dir() {
        let result = build_aligner(&Config::default());
        assert!(matches!(
            result,
            Err(AlignError::ConfigInvalidValue { key, .. }) if key == "decoder.model_dir"
        ));
    }

    #[test]
    fn test_build_aligner_from_model_dir() {
        let model = model_dir_with_dict();
        let mut config = Config::default();
        config.decoder.model_dir = Some(model.path().to_path_buf());

        let aligner = build_aligner(&config).unwrap();
        assert_eq!(aligner.decoder().name(), "htk");
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("The  cat's 2 hats!"), "THE CATS TWO HATS");
    }

    #[test]
    fn test_pronounce_renders_both_files() {
        let model = model_dir_with_dict();
        let mut config = Config::default();
        config.decoder.model_dir = Some(model.path().to_path_buf());
        let text = model.path().join("a.txt");
        std::fs::write(&text, "the cat, the dog").unwrap();

        let out = pronounce(&config, &text).unwrap();
        assert!(out.contains("CAT  K AE1 T\n"));
        assert!(out.contains("DOG  \n"));
        assert!(out.contains("sp  sp\n"));
        assert!(out.contains("#!MLF!#\n"));
        assert!(out.contains("# no pronunciation: DOG"));
    }

    fn write_alignment(path: &Path, durations: &[f64]) {
        let mut t = 0.0;
        let phonemes = durations
            .iter()
            .map(|d| {
                let p = PhonemeSegment::new("AA1", t, t + d);
                t += d;
                p
            })
            .collect();
        Alignment::new(vec![Word::new("A", phonemes)]).save(path).unwrap();
    }

    #[test]
    fn test_evaluate_directories() {
        let predicted = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_alignment(&predicted.path().join("a.json"), &[0.1, 0.2]);
        write_alignment(&target.path().join("a.json"), &[0.1, 0.2]);
        write_alignment(&predicted.path().join("b.json"), &[0.3]);
        write_alignment(&target.path().join("b.json"), &[0.5]);

        let evaluation = evaluate_paths(predicted.path(), target.path()).unwrap();
        assert_eq!(evaluation.phonemes, 3);
        assert!((evaluation.l1 - 0.2 / 3.0).abs() < 1e-9);

        let text = format_evaluation(&evaluation);
        assert!(text.contains("phonemes      3"));
        assert!(text.contains("accuracy@0.01"));
    }

    #[test]
    fn test_evaluate_directory_missing_reference() {
        let predicted = tempfile::tempdir().unwrap();
        let target = tempfile::tempdir().unwrap();
        write_alignment(&predicted.path().join("a.json"), &[0.1]);

        let result = evaluate_paths(predicted.path(), target.path());
        assert!(matches!(result, Err(AlignError::InvalidInput { .. })));
    }

    #[test]
    fn test_collect_items_requires_a_source() {
        assert!(collect_items(None, None, None, None, "json").is_err());
    }
}
