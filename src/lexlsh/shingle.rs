//! Shingle stage: character n-grams of each feature token.

use std::collections::VecDeque;

use crate::error::ValidationError;

/// Output of [`ShingleFilter`].
///
/// Every feature token's grams are followed by exactly one
/// [`ShingleEvent::EndOfFeature`] so downstream stages can group per feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShingleEvent {
    /// One n-gram of the current feature.
    Gram(String),
    /// The current feature has no more grams.
    EndOfFeature,
}

/// All contiguous substrings of exactly `n` characters, in position order.
///
/// A token shorter than `n` yields itself.
#[must_use]
pub fn shingles(token: &str, n: usize) -> Vec<String> {
    let chars: Vec<char> = token.chars().collect();
    if n == 0 || chars.len() < n {
        return vec![token.to_string()];
    }
    chars.windows(n).map(|w| w.iter().collect()).collect()
}

/// Expands feature tokens into n-grams with per-feature boundaries.
#[derive(Debug)]
pub struct ShingleFilter<I> {
    input: I,
    n: usize,
    pending: VecDeque<ShingleEvent>,
    failed: bool,
}

impl<I> ShingleFilter<I>
where
    I: Iterator<Item = Result<String, ValidationError>>,
{
    /// Wraps `input` producing grams of length `n`.
    pub fn new(input: I, n: usize) -> Self {
        Self {
            input,
            n,
            pending: VecDeque::new(),
            failed: false,
        }
    }
}

impl<I> Iterator for ShingleFilter<I>
where
    I: Iterator<Item = Result<String, ValidationError>>,
{
    type Item = Result<ShingleEvent, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(event) = self.pending.pop_front() {
            return Some(Ok(event));
        }
        if self.failed {
            return None;
        }
        match self.input.next()? {
            Ok(token) => {
                self.pending
                    .extend(shingles(&token, self.n).into_iter().map(ShingleEvent::Gram));
                self.pending.push_back(ShingleEvent::EndOfFeature);
                self.pending.pop_front().map(Ok)
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
