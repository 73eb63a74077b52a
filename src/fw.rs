//! Fake Words encoding.
//!
//! Each dimension becomes a "fake word" naming the dimension and its sign,
//! repeated `floor(|v| * q)` times. Under TF-IDF scoring the repetition count
//! acts as the dimension's weight, so documents with similar per-dimension
//! magnitudes and signs accumulate correlated term frequencies.

use serde::{Deserialize, Serialize};

use crate::alphabet;
use crate::encoder::{Encoding, TokenStream, VectorEncoder};
use crate::error::ValidationError;
use crate::vector::{RawFeature, VectorTokenizer};

/// Default quantization factor.
pub const DEFAULT_Q: f32 = 60.0;

/// Fake Words parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FakeWordsParams {
    /// Quantization factor.
    pub q: f32,
}

impl Default for FakeWordsParams {
    fn default() -> Self {
        Self { q: DEFAULT_Q }
    }
}

impl FakeWordsParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.q.is_finite() || self.q <= 0.0 {
            return Err(ValidationError::invalid(
                "q",
                format!("quantization factor must be finite and > 0, got {}", self.q),
            ));
        }
        Ok(())
    }
}

/// The fake word for a dimension: a sign marker followed by the dimension's
/// alphabetic index (`"+a"`, `"-b"`, ...).
#[must_use]
pub fn fake_word(dimension: usize, negative: bool) -> String {
    let sign = if negative { '-' } else { '+' };
    let mut word = String::with_capacity(4);
    word.push(sign);
    word.push_str(&alphabet::encode(dimension as u64));
    word
}

/// Upper bound on the repetitions of a single fake word.
///
/// Embedding components times `q` stay in the hundreds; anything past this is
/// a malformed or hostile vector.
pub const MAX_REPETITIONS: u64 = 1 << 16;

/// Number of repetitions for one component: `floor(|v| * q)`.
///
/// NaN contributes nothing. Infinite values fail with `NonFiniteValue`, and
/// counts above [`MAX_REPETITIONS`] fail with `RepetitionLimit`, which also
/// covers finite values whose product with `q` overflows `f32`.
pub fn repetitions(feature: RawFeature, q: f32) -> Result<u64, ValidationError> {
    let RawFeature { dimension, value } = feature;
    if value.is_nan() {
        return Ok(0);
    }
    if value.is_infinite() {
        return Err(ValidationError::NonFiniteValue { dimension, value });
    }
    let scaled = (value.abs() * q).floor();
    #[allow(clippy::cast_precision_loss)]
    let limit = MAX_REPETITIONS as f32;
    if scaled > limit {
        return Err(ValidationError::RepetitionLimit {
            dimension,
            value,
            limit: MAX_REPETITIONS,
        });
    }
    // 0 <= scaled <= MAX_REPETITIONS, so the cast is exact.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = scaled as u64;
    Ok(count)
}

/// Quantize-and-encode filter over a raw feature stream.
#[derive(Debug)]
pub struct FakeWordsFilter<I> {
    input: I,
    q: f32,
    pending: Option<(String, u64)>,
    failed: bool,
}

impl<I> FakeWordsFilter<I>
where
    I: Iterator<Item = Result<RawFeature, ValidationError>>,
{
    /// Wraps `input` with quantization factor `q`.
    pub fn new(input: I, q: f32) -> Self {
        Self {
            input,
            q,
            pending: None,
            failed: false,
        }
    }
}

impl<I> Iterator for FakeWordsFilter<I>
where
    I: Iterator<Item = Result<RawFeature, ValidationError>>,
{
    type Item = Result<String, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((word, remaining)) = self.pending.take() {
                if remaining > 1 {
                    self.pending = Some((word.clone(), remaining - 1));
                }
                return Some(Ok(word));
            }
            if self.failed {
                return None;
            }

            let feature = match self.input.next()? {
                Ok(f) => f,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };

            match repetitions(feature, self.q) {
                Ok(0) => {}
                Ok(count) => {
                    let word = fake_word(feature.dimension, feature.value < 0.0);
                    self.pending = Some((word, count));
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Fake Words encoder.
#[derive(Debug, Clone, Copy)]
pub struct FakeWordsEncoder {
    params: FakeWordsParams,
}

impl FakeWordsEncoder {
    /// Validates `params` and creates the encoder.
    pub fn new(params: FakeWordsParams) -> Result<Self, ValidationError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Encoder parameters.
    #[must_use]
    pub const fn params(&self) -> FakeWordsParams {
        self.params
    }
}

impl VectorEncoder for FakeWordsEncoder {
    fn encoding(&self) -> Encoding {
        Encoding::FakeWords
    }

    fn tokens<'a>(&'a self, vector: &'a str) -> TokenStream<'a> {
        Box::new(FakeWordsFilter::new(VectorTokenizer::new(vector), self.params.q))
    }
}
