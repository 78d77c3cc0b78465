//! Parallel alignment of many (transcript, audio, output) triples.
//!
//! Items are fed through a channel to a fixed pool of scoped worker threads
//! that share one [`Aligner`]. Every item ends up in the report exactly once,
//! whether it succeeded, failed or panicked.

use crate::alignment::Alignment;
use crate::defaults::SILENCE_LABEL;
use crate::error::{AlignError, FailureCategory, Result};
use crate::pipeline::Aligner;
use crossbeam_channel::unbounded;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItem {
    pub text: PathBuf,
    pub audio: PathBuf,
    pub output: PathBuf,
}

impl BatchItem {
    pub fn new(
        text: impl Into<PathBuf>,
        audio: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            text: text.into(),
            audio: audio.into(),
            output: output.into(),
        }
    }

    /// Parse a manifest of `text<TAB>audio<TAB>output` lines.
    ///
    /// Blank lines and lines starting with `#` are skipped. Relative paths
    /// are resolved against `base`.
    pub fn from_manifest(contents: &str, base: &Path) -> Result<Vec<Self>> {
        let mut items = Vec::new();
        for (index, line) in contents.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
            let [text, audio, output] = fields.as_slice() else {
                return Err(AlignError::invalid_input(format!(
                    "manifest line {}: expected 3 tab-separated fields, got {}",
                    index + 1,
                    fields.len()
                )));
            };
            if [text, audio, output].iter().any(|f| f.is_empty()) {
                return Err(AlignError::invalid_input(format!(
                    "manifest line {}: empty path",
                    index + 1
                )));
            }
            items.push(Self::new(
                base.join(text),
                base.join(audio),
                base.join(output),
            ));
        }
        Ok(items)
    }

    /// Read a manifest file; relative paths are resolved against its directory.
    pub fn read_manifest(path: &Path) -> Result<Vec<Self>> {
        let contents = crate::pipeline::load_text(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_manifest(&contents, base)
    }

    /// Pair `<audio_dir>/<stem>.wav` with `<text_dir>/<stem>.txt`, writing to
    /// `<output_dir>/<stem>.<extension>`.
    ///
    /// Items are sorted by stem. Audio without a transcript is skipped with a
    /// warning.
    pub fn pair_directory(
        audio_dir: &Path,
        text_dir: &Path,
        output_dir: &Path,
        extension: &str,
    ) -> Result<Vec<Self>> {
        let mut stems: Vec<(String, PathBuf)> = Vec::new();
        for entry in std::fs::read_dir(audio_dir)? {
            let path = entry?.path();
            let is_wav = path
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
            if !is_wav || !path.is_file() {
                continue;
            }
            if let Some(stem) = path.file_stem() {
                stems.push((stem.to_string_lossy().into_owned(), path));
            }
        }
        stems.sort();

        let mut items = Vec::with_capacity(stems.len());
        for (stem, audio) in stems {
            let text = text_dir.join(format!("{stem}.txt"));
            if !text.is_file() {
                tracing::warn!(audio = %audio.display(), "no transcript found, skipping");
                continue;
            }
            items.push(Self::new(
                text,
                audio,
                output_dir.join(format!("{stem}.{extension}")),
            ));
        }
        Ok(items)
    }
}

/// Summary of a successful alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentStats {
    /// Transcript words, excluding pauses.
    pub words: usize,
    pub phonemes: usize,
    pub duration_secs: f64,
}

impl AlignmentStats {
    pub fn from_alignment(alignment: &Alignment) -> Self {
        Self {
            words: alignment
                .words
                .iter()
                .filter(|w| w.label != SILENCE_LABEL && w.label != "sil")
                .count(),
            phonemes: alignment.phoneme_count(),
            duration_secs: alignment.end(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemStatus {
    Aligned(AlignmentStats),
    Failed {
        category: FailureCategory,
        message: String,
    },
}

/// Result of one batch item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemOutcome {
    /// Position of the item in the input list.
    pub index: usize,
    pub item: BatchItem,
    pub status: ItemStatus,
    pub elapsed: Duration,
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ItemStatus::Aligned(_))
    }
}

/// Every item's outcome, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<ItemOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(ItemOutcome::is_success)
    }

    /// Seconds of audio aligned successfully.
    pub fn aligned_secs(&self) -> f64 {
        self.outcomes
            .iter()
            .filter_map(|o| match o.status {
                ItemStatus::Aligned(stats) => Some(stats.duration_secs),
                ItemStatus::Failed { .. } => None,
            })
            .sum()
    }
}

/// Align every item with up to `workers` threads.
pub fn run_batch(aligner: &Aligner, items: Vec<BatchItem>, workers: usize) -> BatchReport {
    run_batch_with(aligner, items, workers, |_| {})
}

/// Like [`run_batch`], calling `observer` on the calling thread as each item
/// completes (in completion order).
pub fn run_batch_with(
    aligner: &Aligner,
    items: Vec<BatchItem>,
    workers: usize,
    mut observer: impl FnMut(&ItemOutcome),
) -> BatchReport {
    let started = Instant::now();
    if items.is_empty() {
        return BatchReport::default();
    }
    let workers = workers.clamp(1, items.len());
    tracing::info!(items = items.len(), workers, "starting batch");

    let (job_tx, job_rx) = unbounded::<(usize, BatchItem)>();
    let (outcome_tx, outcome_rx) = unbounded::<ItemOutcome>();
    for job in items.into_iter().enumerate() {
        if job_tx.send(job).is_err() {
            break;
        }
    }
    drop(job_tx);

    let mut outcomes = Vec::new();
    std::thread::scope(|scope| {
        for worker in 0..workers {
            let job_rx = job_rx.clone();
            let outcome_tx = outcome_tx.clone();
            scope.spawn(move || {
                for (index, item) in job_rx.iter() {
                    let outcome = process_item(aligner, index, item);
                    tracing::debug!(worker, index, ok = outcome.is_success(), "item finished");
                    if outcome_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(outcome_tx);

        for outcome in outcome_rx.iter() {
            observer(&outcome);
            outcomes.push(outcome);
        }
    });

    outcomes.sort_by_key(|o| o.index);
    let report = BatchReport {
        outcomes,
        elapsed: started.elapsed(),
    };
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.len() - report.succeeded(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "batch finished"
    );
    report
}

fn process_item(aligner: &Aligner, index: usize, item: BatchItem) -> ItemOutcome {
    let started = Instant::now();
    let result = catch_unwind(AssertUnwindSafe(|| {
        aligner.align_file_to_file(&item.text, &item.audio, &item.output)
    }));

    let status = match result {
        Ok(Ok(alignment)) => ItemStatus::Aligned(AlignmentStats::from_alignment(&alignment)),
        Ok(Err(e)) => {
            tracing::warn!(index, audio = %item.audio.display(), error = %e, "item failed");
            ItemStatus::Failed {
                category: e.category(),
                message: e.to_string(),
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(index, audio = %item.audio.display(), panic = %message, "item panicked");
            ItemStatus::Failed {
                category: FailureCategory::Environment,
                message: format!("panicked: {message}"),
            }
        }
    };

    ItemOutcome {
        index,
        item,
        status,
        elapsed: started.elapsed(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
