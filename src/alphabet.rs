//! Base-26 alphabetic integer encoding.
//!
//! Digits `a..=z` stand for `0..=25`, most significant first. `0` encodes as
//! `"a"`. Dimension indices use the minimal (variable) width; bucket labels are
//! left-padded with `'a'` to a fixed width derived from the bucket count so
//! every label for a given `b` has the same length.

/// Number of symbols in the label alphabet.
pub const RADIX: u64 = 26;

/// Encodes `value` with the minimal number of digits.
#[must_use]
pub fn encode(value: u64) -> String {
    encode_padded(value, 1)
}

/// Encodes `value` left-padded with `'a'` to at least `width` digits.
#[must_use]
pub fn encode_padded(value: u64, width: usize) -> String {
    let mut digits = Vec::with_capacity(width.max(1));
    let mut rest = value;
    loop {
        // rest % 26 < 26, so the narrowing is exact.
        #[allow(clippy::cast_possible_truncation)]
        let digit = (rest % RADIX) as u8;
        digits.push(b'a' + digit);
        rest /= RADIX;
        if rest == 0 {
            break;
        }
    }
    while digits.len() < width {
        digits.push(b'a');
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Decodes an alphabetic label back to its integer value.
///
/// Returns `None` for empty input, characters outside `a..=z`, or overflow.
#[must_use]
pub fn decode(label: &str) -> Option<u64> {
    if label.is_empty() {
        return None;
    }
    label.bytes().try_fold(0u64, |acc, b| {
        if !b.is_ascii_lowercase() {
            return None;
        }
        acc.checked_mul(RADIX)?.checked_add(u64::from(b - b'a'))
    })
}

/// Fixed label width for bucket indices in `[0, bucket_count)`.
///
/// The smallest `w >= 1` with `26^w >= bucket_count`, i.e. `ceil(log26 b)`
/// clamped to one digit.
#[must_use]
pub fn label_width(bucket_count: u64) -> usize {
    let mut width = 1usize;
    let mut capacity = RADIX;
    while capacity < bucket_count {
        capacity = capacity.saturating_mul(RADIX);
        width += 1;
    }
    width
}
