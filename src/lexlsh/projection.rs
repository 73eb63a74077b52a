//! Multi-hash projection stage.
//!
//! Every retained gram is hashed once per round; each hash is reduced to a
//! bucket and emitted as `alpha(round) || "_" || alpha_padded(bucket)`.

use crate::alphabet;
use crate::error::ValidationError;
use crate::hash;

/// Formats a bucket term.
#[must_use]
pub fn bucket_token(round: u32, bucket: u64, width: usize) -> String {
    let mut token = alphabet::encode(u64::from(round));
    token.push('_');
    token.push_str(&alphabet::encode_padded(bucket, width));
    token
}

/// Splits a bucket term back into `(round, bucket)`.
#[must_use]
pub fn parse_bucket_token(token: &str) -> Option<(u64, u64)> {
    let (round, bucket) = token.split_once('_')?;
    Some((alphabet::decode(round)?, alphabet::decode(bucket)?))
}

/// Emits `hash_count` bucket terms per input gram, rounds ascending.
#[derive(Debug)]
pub struct MultiHashFilter<I> {
    input: I,
    hash_count: u32,
    bucket_count: u64,
    width: usize,
    current: Option<String>,
    round: u32,
}

impl<I> MultiHashFilter<I>
where
    I: Iterator<Item = Result<String, ValidationError>>,
{
    /// Wraps `input`. `hash_count` and `bucket_count` must be non-zero.
    pub fn new(input: I, hash_count: u32, bucket_count: u64) -> Self {
        Self {
            input,
            hash_count,
            bucket_count,
            width: alphabet::label_width(bucket_count),
            current: None,
            round: 0,
        }
    }
}

impl<I> Iterator for MultiHashFilter<I>
where
    I: Iterator<Item = Result<String, ValidationError>>,
{
    type Item = Result<String, ValidationError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(gram) = &self.current {
                if self.round < self.hash_count {
                    let b = hash::bucket(self.round, gram.as_bytes(), self.bucket_count);
                    let token = bucket_token(self.round, b, self.width);
                    self.round += 1;
                    return Some(Ok(token));
                }
                self.current = None;
            }
            match self.input.next()? {
                Ok(gram) => {
                    self.current = Some(gram);
                    self.round = 0;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
