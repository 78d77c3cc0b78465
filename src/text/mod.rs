//! Transcript cleanup: whitespace, numerals and punctuation.

pub mod normalize;
pub mod numbers;

pub use normalize::Normalizer;
pub use numbers::{EnglishNumbers, NumberExpander};
