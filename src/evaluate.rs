//! Phoneme duration metrics between predicted and reference alignments.

use crate::alignment::Alignment;
use crate::error::{AlignError, Result};
use serde::Serialize;

/// Thresholds (seconds) for duration accuracy.
pub const ACCURACY_LEVELS: [f64; 4] = [0.01, 0.005, 0.0025, 0.00125];

/// Accumulates duration error over any number of alignment pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct DurationMetrics {
    count: usize,
    absolute_error: f64,
    within: [usize; ACCURACY_LEVELS.len()],
}

/// Aggregated metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub phonemes: usize,
    /// Mean absolute duration error in seconds.
    pub l1: f64,
    pub accuracy: Vec<LevelAccuracy>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelAccuracy {
    pub level: f64,
    /// Fraction of phonemes whose duration error is strictly below `level`.
    pub accuracy: f64,
}

impl Default for DurationMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl DurationMetrics {
    pub fn new() -> Self {
        Self {
            count: 0,
            absolute_error: 0.0,
            within: [0; ACCURACY_LEVELS.len()],
        }
    }

    /// Add one predicted/target pair. Phonemes are compared by position.
    pub fn update(&mut self, predicted: &Alignment, target: &Alignment) -> Result<()> {
        self.update_durations(&predicted.durations(), &target.durations())
    }

    pub fn update_durations(&mut self, predicted: &[f64], target: &[f64]) -> Result<()> {
        if predicted.len() != target.len() {
            return Err(AlignError::invalid_input(format!(
                "predicted alignment has {} phonemes, target has {}",
                predicted.len(),
                target.len()
            )));
        }
        for (p, t) in predicted.iter().zip(target) {
            let error = (p - t).abs();
            self.absolute_error += error;
            for (hits, level) in self.within.iter_mut().zip(ACCURACY_LEVELS) {
                if error < level {
                    *hits += 1;
                }
            }
        }
        self.count += predicted.len();
        Ok(())
    }

    /// `None` until at least one phoneme has been compared.
    pub fn summary(&self) -> Option<Evaluation> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(Evaluation {
            phonemes: self.count,
            l1: self.absolute_error / n,
            accuracy: ACCURACY_LEVELS
                .iter()
                .zip(self.within)
                .map(|(&level, hits)| LevelAccuracy {
                    level,
                    accuracy: hits as f64 / n,
                })
                .collect(),
        })
    }
}

/// Compare a single pair of alignments.
pub fn evaluate(predicted: &Alignment, target: &Alignment) -> Result<Evaluation> {
    let mut metrics = DurationMetrics::new();
    metrics.update(predicted, target)?;
    metrics
        .summary()
        .ok_or_else(|| AlignError::invalid_input("alignments contain no phonemes"))
}
