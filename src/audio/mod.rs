//! Audio input and output.

pub mod wav;

pub use wav::{AudioBuffer, resample, write_pcm16};
