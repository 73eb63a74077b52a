//! Textual vector parsing.
//!
//! A vector is written as whitespace-separated float literals (optionally
//! signed, optionally in `E`/`e` scientific notation). [`VectorTokenizer`]
//! turns that text into a lazy stream of [`RawFeature`]s which the encoders
//! consume one dimension at a time.

use std::str::SplitWhitespace;

use crate::error::ValidationError;

/// One dimension of an input vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawFeature {
    /// Zero-based dimension index.
    pub dimension: usize,
    /// Component value.
    pub value: f32,
}

/// Lazily parses a textual vector into `(dimension, value)` pairs.
///
/// Empty or all-whitespace input yields an empty stream. A malformed literal
/// yields `Err(InvalidVectorFormat)` at its position; the tokenizer is fused
/// after the first error.
#[derive(Debug, Clone)]
pub struct VectorTokenizer<'a> {
    parts: SplitWhitespace<'a>,
    position: usize,
    failed: bool,
}

impl<'a> VectorTokenizer<'a> {
    /// Creates a tokenizer over `text`.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            parts: text.split_whitespace(),
            position: 0,
            failed: false,
        }
    }
}

impl Iterator for VectorTokenizer<'_> {
    type Item = Result<RawFeature, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let literal = self.parts.next()?;
        let dimension = self.position;
        self.position += 1;

        match parse_component(literal) {
            Some(value) => Some(Ok(RawFeature { dimension, value })),
            None => {
                self.failed = true;
                Some(Err(ValidationError::InvalidVectorFormat {
                    position: dimension,
                    literal: literal.to_string(),
                }))
            }
        }
    }
}

/// Parses one float literal.
///
/// Accepts what `f32::from_str` accepts, which includes `inf` and `NaN`;
/// the encoders decide how to treat non-finite values.
fn parse_component(literal: &str) -> Option<f32> {
    literal.parse::<f32>().ok()
}

/// Parses a whole textual vector.
pub fn parse_vector(text: &str) -> Result<Vec<f32>, ValidationError> {
    VectorTokenizer::new(text)
        .map(|f| f.map(|f| f.value))
        .collect()
}

/// Formats a vector back to its textual form (single spaces, shortest
/// round-trip representation of each component).
#[must_use]
pub fn format_vector(values: &[f32]) -> String {
    let mut out = String::with_capacity(values.len() * 12);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&v.to_string());
    }
    out
}
