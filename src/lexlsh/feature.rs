//! Feature stage: one lexical fingerprint per dimension.
//!
//! `sign || digits || "_" || alpha(dimension)` where `digits` is `|v|`
//! rounded half-up to a fixed number of decimals with the point removed.

use crate::alphabet;
use crate::error::ValidationError;
use crate::vector::RawFeature;

/// Rounds `magnitude` half-up to `decimals` places and returns the digits
/// without the decimal point (at least one integer digit).
///
/// Rounding operates on the shortest decimal representation that round-trips
/// to the same `f32`, so `0.45` rounds to `"05"` at one decimal even though
/// its binary value is slightly below 0.45.
#[must_use]
pub fn round_half_up_digits(magnitude: f32, decimals: u32) -> String {
    // Display for floats never uses exponent notation.
    let repr = format!("{}", magnitude.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let keep = decimals as usize;
    let mut digits: Vec<u8> = int_part.bytes().collect();
    let frac = frac_part.as_bytes();
    digits.extend((0..keep).map(|i| frac.get(i).copied().unwrap_or(b'0')));

    let round_up = frac.get(keep).is_some_and(|&d| d >= b'5');
    if round_up {
        let mut carry = true;
        for d in digits.iter_mut().rev() {
            if *d == b'9' {
                *d = b'0';
            } else {
                *d += 1;
                carry = false;
                break;
            }
        }
        if carry {
            digits.insert(0, b'1');
        }
    }

    digits.into_iter().map(char::from).collect()
}

/// Builds the feature token for one dimension.
///
/// Fails with `NonFiniteValue` for NaN and infinities, which have no decimal
/// representation.
pub fn feature_token(feature: RawFeature, decimals: u32) -> Result<String, ValidationError> {
    if !feature.value.is_finite() {
        return Err(ValidationError::NonFiniteValue {
            dimension: feature.dimension,
            value: feature.value,
        });
    }
    let sign = if feature.value >= 0.0 { '+' } else { '-' };
    let digits = round_half_up_digits(feature.value, decimals);
    let index = alphabet::encode(feature.dimension as u64);

    let mut token = String::with_capacity(digits.len() + index.len() + 2);
    token.push(sign);
    token.push_str(&digits);
    token.push('_');
    token.push_str(&index);
    Ok(token)
}

/// Maps raw features to feature tokens.
#[derive(Debug)]
pub struct FeatureEncoder<I> {
    input: I,
    decimals: u32,
    failed: bool,
}

impl<I> FeatureEncoder<I>
where
    I: Iterator<Item = Result<RawFeature, ValidationError>>,
{
    /// Wraps `input`, rounding to `decimals` places.
    pub fn new(input: I, decimals: u32) -> Self {
        Self {
            input,
            decimals,
            failed: false,
        }
    }
}

impl<I> Iterator for FeatureEncoder<I>
where
    I: Iterator<Item = Result<RawFeature, ValidationError>>,
{
    type Item = Result<String, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self
            .input
            .next()?
            .and_then(|feature| feature_token(feature, self.decimals));
        if item.is_err() {
            self.failed = true;
        }
        Some(item)
    }
}
