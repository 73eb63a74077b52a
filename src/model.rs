//! GloVe-style word vector files.
//!
//! One entry per line: `WORD v1 v2 ... vd`, whitespace separated. A word may
//! appear on several lines; every occurrence is kept.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{AnnError, AnnResult, ValidationError};
use crate::vector::parse_vector;

/// Word → vectors multimap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WordVectors {
    entries: BTreeMap<String, Vec<Vec<f32>>>,
}

impl WordVectors {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one vector for `word`.
    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) {
        self.entries.entry(word.into()).or_default().push(vector);
    }

    /// All vectors recorded for `word`, in file order.
    #[must_use]
    pub fn get(&self, word: &str) -> &[Vec<f32>] {
        self.entries.get(word).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of distinct words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no words were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(word, vector)` pairs, words ascending.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f32])> {
        self.entries
            .iter()
            .flat_map(|(w, vs)| vs.iter().map(move |v| (w.as_str(), v.as_slice())))
    }
}

/// Splits a model line into its word and the vector text that follows.
///
/// Returns `None` for blank lines.
#[must_use]
pub fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim_start())),
        None => Some((line, "")),
    }
}

/// Parses the vector text of a row read from line `line` (1-based).
///
/// A malformed component fails with `InvalidVectorRow`, naming both the line
/// and the component.
pub fn parse_row(vector: &str, line: usize) -> Result<Vec<f32>, ValidationError> {
    parse_vector(vector).map_err(|e| match e {
        ValidationError::InvalidVectorFormat { position, literal } => {
            ValidationError::InvalidVectorRow {
                line,
                position,
                literal,
            }
        }
        other => other,
    })
}

/// Reads word vectors from any buffered source.
///
/// A malformed component fails with `InvalidVectorRow` naming the 1-based
/// line. Words without components are skipped with a warning. `source` only
/// labels read errors.
pub fn read_word_vectors<R: BufRead>(reader: R, source: &Path) -> AnnResult<WordVectors> {
    let mut vectors = WordVectors::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| AnnError::index_io(source, &e))?;
        let Some((word, rest)) = split_line(&line) else {
            continue;
        };
        let vector = parse_row(rest, line_no)?;
        if vector.is_empty() {
            warn!(line = line_no, word, "skipping model entry without components");
            continue;
        }
        vectors.insert(word, vector);
    }
    Ok(vectors)
}

/// Reads a model file from disk.
pub fn read_glove(path: &Path) -> AnnResult<WordVectors> {
    info!(path = %path.display(), "loading model");
    let file = File::open(path).map_err(|e| AnnError::index_io(path, &e))?;
    let vectors = read_word_vectors(BufReader::new(file), path)?;
    info!(words = vectors.len(), "model loaded");
    Ok(vectors)
}
