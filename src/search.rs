//! Nearest-neighbor search driver behind the `ann-search` binary.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::encoder::{EncoderConfig, VectorEncoder};
use crate::error::{AnnResult, ExecutionError};
use crate::index::{IndexBuilderConfig, VectorIndex, FIELD_VECTOR};
use crate::model::read_glove;
use crate::query::{CommonTermsQuery, QueryAssembler};
use crate::vector::format_vector;

/// Default number of neighbors returned.
pub const DEFAULT_DEPTH: usize = 10;

/// Default high-frequency cutoff on the command line.
pub const DEFAULT_CLI_CUTOFF: f32 = 0.999;

/// Where the query vector comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VectorSource {
    /// Look the word up in a model file.
    Model(PathBuf),
    /// Use the vector(s) stored in the index under the word.
    Stored,
}

/// One search invocation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Index directory.
    pub index_path: PathBuf,
    /// Lookup key for the query vector.
    pub word: String,
    /// Query vector source.
    pub source: VectorSource,
    /// Encoder used for both index and query.
    pub encoder: EncoderConfig,
    /// Neighbors per query vector.
    pub depth: usize,
    /// High-frequency document cutoff.
    pub cutoff: f32,
    /// Minimum-should-match.
    pub msm: f32,
    /// Index encoding threads (0 = available parallelism).
    pub workers: usize,
}

impl SearchRequest {
    /// A request with default depth, cutoff and msm.
    #[must_use]
    pub fn new(
        index_path: impl Into<PathBuf>,
        word: impl Into<String>,
        source: VectorSource,
        encoder: EncoderConfig,
    ) -> Self {
        Self {
            index_path: index_path.into(),
            word: word.into(),
            source,
            encoder,
            depth: DEFAULT_DEPTH,
            cutoff: DEFAULT_CLI_CUTOFF,
            msm: 0.0,
            workers: 0,
        }
    }
}

/// A ranked neighbor.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// 1-based rank.
    pub rank: usize,
    /// Document identifier.
    pub id: String,
    /// Similarity score.
    pub score: f32,
}

/// Results for one query vector.
#[derive(Debug, Clone)]
pub struct SearchReport {
    /// The looked-up word.
    pub word: String,
    /// Requested depth.
    pub depth: usize,
    /// The executed query.
    pub query: CommonTermsQuery,
    /// Ranked neighbors.
    pub neighbors: Vec<Neighbor>,
    /// Query execution time.
    pub elapsed: Duration,
}

impl fmt::Display for SearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} nearest neighbors of '{}':", self.depth, self.word)?;
        for n in &self.neighbors {
            writeln!(f, "{}. {} ({:.3})", n.rank, n.id, n.score)?;
        }
        write!(f, "Search time: {}ms", self.elapsed.as_millis())
    }
}

/// Prepared searcher: an opened index plus query settings.
#[derive(Debug)]
pub struct Searcher {
    index: VectorIndex,
    encoder: Arc<dyn VectorEncoder>,
    assembler: QueryAssembler,
}

impl Searcher {
    /// Validates the request parameters and opens the index.
    pub fn open(request: &SearchRequest) -> AnnResult<Self> {
        let encoder = request.encoder.build()?;
        let assembler = QueryAssembler::new(request.cutoff, request.msm)?;
        let index = VectorIndex::open(
            &request.index_path,
            Arc::clone(&encoder),
            IndexBuilderConfig {
                workers: request.workers,
                ..IndexBuilderConfig::default()
            },
        )?;
        Ok(Self {
            index,
            encoder,
            assembler,
        })
    }

    /// The opened index.
    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Query vectors for `word` from `source`.
    pub fn query_vectors(&self, word: &str, source: &VectorSource) -> AnnResult<Vec<String>> {
        let vectors: Vec<String> = match source {
            VectorSource::Stored => self
                .index
                .stored_vectors(word)
                .into_iter()
                .map(str::to_string)
                .collect(),
            VectorSource::Model(path) => read_glove(path)?
                .get(word)
                .iter()
                .map(|v| format_vector(v))
                .collect(),
        };
        if vectors.is_empty() {
            warn!(word, "no vector found");
            return Err(ExecutionError::WordNotFound {
                word: word.to_string(),
            }
            .into());
        }
        Ok(vectors)
    }

    /// Searches the neighbors of one textual vector.
    pub fn search_vector(&self, word: &str, vector: &str, depth: usize) -> AnnResult<SearchReport> {
        let query = self
            .assembler
            .assemble_vector(FIELD_VECTOR, self.encoder.as_ref(), vector)?;

        let start = Instant::now();
        let hits = self.index.search(&query, depth);
        let elapsed = start.elapsed();
        debug!(word, terms = query.terms.len(), hits = hits.len(), "query executed");

        let neighbors = hits
            .into_iter()
            .enumerate()
            .map(|(i, hit)| Neighbor {
                rank: i + 1,
                id: hit.id,
                score: hit.score,
            })
            .collect();

        Ok(SearchReport {
            word: word.to_string(),
            depth,
            query,
            neighbors,
            elapsed,
        })
    }
}

/// Runs a full search: open the index, fetch the query vector(s), search each.
pub fn run(request: &SearchRequest) -> AnnResult<Vec<SearchReport>> {
    let searcher = Searcher::open(request)?;
    searcher
        .query_vectors(&request.word, &request.source)?
        .iter()
        .map(|v| searcher.search_vector(&request.word, v, request.depth))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_format() {
        let report = SearchReport {
            word: "king".to_string(),
            depth: 2,
            query: QueryAssembler::new(0.5, 0.0)
                .unwrap()
                .assemble(FIELD_VECTOR, ["+a"])
                .unwrap(),
            neighbors: vec![
                Neighbor { rank: 1, id: "king".to_string(), score: 1.5 },
                Neighbor { rank: 2, id: "queen".to_string(), score: 0.123_46 },
            ],
            elapsed: Duration::from_millis(7),
        };
        assert_eq!(
            report.to_string(),
            "2 nearest neighbors of 'king':\n1. king (1.500)\n2. queen (0.123)\nSearch time: 7ms"
        );
    }

    #[test]
    fn request_defaults() {
        let req = SearchRequest::new(
            "/tmp/idx",
            "w",
            VectorSource::Stored,
            EncoderConfig::defaults(crate::Encoding::FakeWords),
        );
        assert_eq!(req.depth, 10);
        assert!((req.cutoff - 0.999).abs() < f32::EPSILON);
        assert!(req.msm.abs() < f32::EPSILON);
    }
}
