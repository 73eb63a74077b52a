//! Hash-set stage: keep the `s` smallest distinct grams of each feature.
//!
//! Lexicographic order stands in for a min-hash permutation. It is stable
//! across runs and platforms, which keeps index and query terms aligned.

use std::collections::{BTreeSet, VecDeque};

use crate::error::ValidationError;
use crate::lexlsh::shingle::ShingleEvent;

/// Groups grams per feature and emits the `size` smallest in ascending order.
#[derive(Debug)]
pub struct HashSetFilter<I> {
    input: I,
    size: usize,
    group: BTreeSet<String>,
    ready: VecDeque<String>,
    failed: bool,
}

impl<I> HashSetFilter<I>
where
    I: Iterator<Item = Result<ShingleEvent, ValidationError>>,
{
    /// Wraps `input`, retaining at most `size` grams per feature.
    pub fn new(input: I, size: usize) -> Self {
        Self {
            input,
            size,
            group: BTreeSet::new(),
            ready: VecDeque::new(),
            failed: false,
        }
    }

    fn flush(&mut self) {
        let group = std::mem::take(&mut self.group);
        self.ready.extend(group.into_iter().take(self.size));
    }
}

impl<I> Iterator for HashSetFilter<I>
where
    I: Iterator<Item = Result<ShingleEvent, ValidationError>>,
{
    type Item = Result<String, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(gram) = self.ready.pop_front() {
                return Some(Ok(gram));
            }
            if self.failed {
                return None;
            }
            match self.input.next() {
                Some(Ok(ShingleEvent::Gram(gram))) => {
                    self.group.insert(gram);
                }
                Some(Ok(ShingleEvent::EndOfFeature)) => self.flush(),
                Some(Err(e)) => {
                    // A partially collected feature is dropped with the error.
                    self.failed = true;
                    self.group.clear();
                    return Some(Err(e));
                }
                None => {
                    if self.group.is_empty() {
                        return None;
                    }
                    self.flush();
                }
            }
        }
    }
}
