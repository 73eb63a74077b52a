//! Lexical locality-sensitive hashing.
//!
//! A four-stage pull pipeline over the raw features of one vector:
//!
//! 1. [`FeatureEncoder`]: `(i, v)` → `"+05_a"` (sign, rounded digits, dimension)
//! 2. [`ShingleFilter`]: feature → character n-grams, one boundary per feature
//! 3. [`HashSetFilter`]: keep the `s` lexicographically smallest grams per feature
//! 4. [`MultiHashFilter`]: each gram → `h` bucket terms (`"a_kd"`, `"b_ct"`, ...)
//!
//! Only the hash-set stage buffers, and only the grams of a single feature.

mod feature;
mod hashset;
mod projection;
mod shingle;

use serde::{Deserialize, Serialize};

use crate::encoder::{Encoding, TokenStream, VectorEncoder};
use crate::error::ValidationError;
use crate::vector::VectorTokenizer;

pub use feature::{feature_token, round_half_up_digits, FeatureEncoder};
pub use hashset::HashSetFilter;
pub use projection::{bucket_token, parse_bucket_token, MultiHashFilter};
pub use shingle::{shingles, ShingleEvent, ShingleFilter};

/// Largest supported number of decimals.
pub const MAX_DECIMALS: u32 = 9;

/// LexLSH parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexLshParams {
    /// Decimal places kept in feature tokens (`d`).
    #[serde(alias = "d")]
    pub decimals: u32,
    /// N-gram length (`n`).
    #[serde(alias = "n")]
    pub ngrams: usize,
    /// Hash rounds per retained gram (`h`).
    #[serde(alias = "h")]
    pub hash_count: u32,
    /// Buckets per round (`b`).
    #[serde(alias = "b")]
    pub bucket_count: u64,
    /// Grams retained per feature (`s`).
    #[serde(alias = "hsize")]
    pub hash_set_size: usize,
}

impl Default for LexLshParams {
    fn default() -> Self {
        Self {
            decimals: 1,
            ngrams: 2,
            hash_count: 1,
            bucket_count: 300,
            hash_set_size: 1,
        }
    }
}

impl LexLshParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.decimals > MAX_DECIMALS {
            return Err(ValidationError::invalid(
                "decimals",
                format!("must be at most {MAX_DECIMALS}, got {}", self.decimals),
            ));
        }
        if self.ngrams == 0 {
            return Err(ValidationError::invalid("ngrams", "must be at least 1"));
        }
        if self.hash_count == 0 {
            return Err(ValidationError::invalid("hash_count", "must be at least 1"));
        }
        if self.bucket_count == 0 {
            return Err(ValidationError::invalid("bucket_count", "must be at least 1"));
        }
        if self.hash_set_size == 0 {
            return Err(ValidationError::invalid("hash_set_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// LexLSH encoder.
#[derive(Debug, Clone, Copy)]
pub struct LexLshEncoder {
    params: LexLshParams,
}

impl LexLshEncoder {
    /// Validates `params` and creates the encoder.
    pub fn new(params: LexLshParams) -> Result<Self, ValidationError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Encoder parameters.
    #[must_use]
    pub const fn params(&self) -> LexLshParams {
        self.params
    }

    /// Feature tokens of `vector` (stage 1 only).
    pub fn features<'a>(&self, vector: &'a str) -> FeatureEncoder<VectorTokenizer<'a>> {
        FeatureEncoder::new(VectorTokenizer::new(vector), self.params.decimals)
    }

    /// Grams retained by the hash-set stage (stages 1-3).
    pub fn retained_shingles<'a>(
        &self,
        vector: &'a str,
    ) -> HashSetFilter<ShingleFilter<FeatureEncoder<VectorTokenizer<'a>>>> {
        HashSetFilter::new(
            ShingleFilter::new(self.features(vector), self.params.ngrams),
            self.params.hash_set_size,
        )
    }
}

impl VectorEncoder for LexLshEncoder {
    fn encoding(&self) -> Encoding {
        Encoding::LexLsh
    }

    fn tokens<'a>(&'a self, vector: &'a str) -> TokenStream<'a> {
        Box::new(MultiHashFilter::new(
            self.retained_shingles(vector),
            self.params.hash_count,
            self.params.bucket_count,
        ))
    }
}
