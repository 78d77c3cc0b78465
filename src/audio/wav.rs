//! WAV loading, resampling and writing for the decoder front end.

use crate::error::{AlignError, Result};
use std::io::Read;
use std::path::Path;

/// Mono audio decoded to `f32` in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioBuffer {
    /// Decode any reader holding WAV data.
    ///
    /// Integer formats of 8 to 32 bits and 32-bit float are accepted;
    /// multi-channel audio is averaged down to mono.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let wav_reader = hound::WavReader::new(reader).map_err(|e| AlignError::Audio {
            message: format!("Failed to parse WAV file: {}", e),
        })?;

        let spec = wav_reader.spec();
        if spec.channels == 0 {
            return Err(AlignError::Audio {
                message: "WAV file declares zero channels".to_string(),
            });
        }

        let interleaved = read_samples(wav_reader, spec)?;

        let channels = spec.channels as usize;
        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Decode a WAV file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| AlignError::Audio {
            message: format!("Failed to open {}: {}", path.display(), e),
        })?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

fn read_samples<R: Read>(reader: hound::WavReader<R>, spec: hound::WavSpec) -> Result<Vec<f32>> {
    let read_error = |e: hound::Error| AlignError::Audio {
        message: format!("Failed to read WAV samples: {}", e),
    };

    match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_error),
        hound::SampleFormat::Int => {
            if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                return Err(AlignError::Audio {
                    message: format!("Unsupported bit depth: {}", spec.bits_per_sample),
                });
            }
            let scale = (1u64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(read_error)
        }
    }
}

/// Write mono 16-bit PCM, clamping samples to `[-1.0, 1.0]`.
pub fn write_pcm16(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let write_error = |e: hound::Error| AlignError::Audio {
        message: format!("Failed to write {}: {}", path.display(), e),
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(write_error)?;
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16;
        writer.write_sample(value).map_err(write_error)?;
    }
    writer.finalize().map_err(write_error)
}

/// Simple linear interpolation resampling.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as u64 * to_rate as u64).div_ceil(from_rate as u64) as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as f32
            }
        })
        .collect()
}
