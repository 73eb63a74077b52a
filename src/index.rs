//! In-memory inverted index over encoded vectors.
//!
//! An index directory holds one file, [`VECTORS_FILE`], in the model file
//! format (`ID v1 v2 ...` per line). Opening the directory encodes every
//! stored vector with the chosen encoder on a small bounded worker pool and
//! builds posting lists for the [`FIELD_VECTOR`] field. The stored vector text
//! is kept verbatim so `-stored` lookups return exactly what was indexed.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, info};

use crate::encoder::{Encoding, VectorEncoder};
use crate::error::{AnnError, AnnResult, ExecutionError, ValidationError};
use crate::model::{parse_row, split_line};
use crate::query::{CommonTermsQuery, TermStatistics, WeightedTerm};
use crate::vector::format_vector;

/// File inside an index directory holding the stored vectors.
pub const VECTORS_FILE: &str = "vectors.txt";

/// Stored identifier field.
pub const FIELD_ID: &str = "id";

/// Encoded vector field.
pub const FIELD_VECTOR: &str = "vector";

/// BM25 term frequency saturation.
const BM25_K1: f64 = 1.2;

/// BM25 length normalization.
const BM25_B: f64 = 0.75;

/// Term scoring model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    /// Classic TF-IDF: `sqrt(tf) * idf^2 / sqrt(len)`.
    Classic,
    /// Okapi BM25.
    Bm25,
}

impl Similarity {
    /// Scoring model matched to an encoding.
    ///
    /// Fake Words relies on raw term frequency to carry magnitude, which BM25
    /// saturation would flatten, so it scores with classic TF-IDF.
    #[must_use]
    pub const fn for_encoding(encoding: Encoding) -> Self {
        match encoding {
            Encoding::FakeWords => Self::Classic,
            Encoding::LexLsh => Self::Bm25,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn score(self, stats: &ScoringStats, doc_freq: u64, freq: u32, doc_len: u32) -> f64 {
        let n = stats.num_docs as f64;
        let df = doc_freq as f64;
        let tf = f64::from(freq);
        let len = f64::from(doc_len.max(1));
        match self {
            Self::Classic => {
                let idf = 1.0 + (n / (df + 1.0)).ln();
                tf.sqrt() * idf * idf / len.sqrt()
            }
            Self::Bm25 => {
                let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
                let avg = stats.avg_doc_len.max(1.0);
                tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * (1.0 - BM25_B + BM25_B * len / avg)) * idf
            }
        }
    }
}

struct ScoringStats {
    num_docs: u64,
    avg_doc_len: f64,
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    /// Identifier (the model word).
    pub id: String,
    /// Vector text as stored.
    pub vector: String,
}

/// A search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    /// Internal document number (load order).
    pub doc: usize,
    /// Stored identifier.
    pub id: String,
    /// Similarity score.
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    doc: u32,
    freq: u32,
}

/// Worker pool settings for encoding documents.
#[derive(Debug, Clone)]
pub struct IndexBuilderConfig {
    /// Encoding threads (0 = available parallelism).
    pub workers: usize,
    /// Maximum queued documents.
    pub queue_capacity: usize,
}

impl Default for IndexBuilderConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: 1024,
        }
    }
}

impl IndexBuilderConfig {
    fn worker_count(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }
}

/// Collects documents and encodes them into a [`VectorIndex`].
#[derive(Debug)]
pub struct IndexBuilder {
    encoder: Arc<dyn VectorEncoder>,
    config: IndexBuilderConfig,
    docs: Vec<StoredDocument>,
}

struct Job {
    doc: usize,
    vector: String,
}

type JobResult = (usize, Result<Vec<String>, ValidationError>);

impl IndexBuilder {
    /// Creates a builder encoding with `encoder`.
    #[must_use]
    pub fn new(encoder: Arc<dyn VectorEncoder>, config: IndexBuilderConfig) -> Self {
        Self {
            encoder,
            config,
            docs: Vec::new(),
        }
    }

    /// Adds a document from its textual vector.
    pub fn add_text(&mut self, id: impl Into<String>, vector: impl Into<String>) -> &mut Self {
        self.docs.push(StoredDocument {
            id: id.into(),
            vector: vector.into(),
        });
        self
    }

    /// Adds a document from vector components.
    pub fn add(&mut self, id: impl Into<String>, vector: &[f32]) -> &mut Self {
        self.add_text(id, format_vector(vector))
    }

    /// Number of documents added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True when no documents were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Encodes every document and builds posting lists.
    ///
    /// Fails with the first encoding error in document order.
    pub fn build(self) -> AnnResult<VectorIndex> {
        let encodings = self.encode_all()?;

        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lens = Vec::with_capacity(self.docs.len());
        let mut total_len = 0u64;

        for (doc, tokens) in encodings.into_iter().enumerate() {
            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                let freq = freqs.entry(token).or_default();
                *freq = freq.saturating_add(1);
            }
            let len = freqs.values().fold(0u32, |acc, &f| acc.saturating_add(f));
            let doc_id = u32::try_from(doc)
                .map_err(|_| AnnError::internal("index exceeds u32::MAX documents"))?;
            for (term, freq) in freqs {
                postings.entry(term).or_default().push(Posting { doc: doc_id, freq });
            }
            doc_lens.push(len);
            total_len += u64::from(len);
        }
        // Documents were visited in order, so every posting list is sorted.

        info!(
            documents = self.docs.len(),
            terms = postings.len(),
            encoding = %self.encoder.encoding(),
            "index built"
        );

        Ok(VectorIndex {
            similarity: Similarity::for_encoding(self.encoder.encoding()),
            encoder: self.encoder,
            docs: self.docs,
            doc_lens,
            total_len,
            postings,
        })
    }

    fn encode_all(&self) -> AnnResult<Vec<Vec<String>>> {
        let workers = self.config.worker_count().min(self.docs.len()).max(1);
        let (job_tx, job_rx) = bounded::<Job>(self.config.queue_capacity.max(1));
        let (result_tx, result_rx) = unbounded::<JobResult>();

        thread::scope(|scope| -> AnnResult<()> {
            for idx in 0..workers {
                let rx: Receiver<Job> = job_rx.clone();
                let tx: Sender<JobResult> = result_tx.clone();
                let encoder = Arc::clone(&self.encoder);
                thread::Builder::new()
                    .name(format!("lexann-index-{idx}"))
                    .spawn_scoped(scope, move || {
                        while let Ok(job) = rx.recv() {
                            let result = encoder.encode(&job.vector);
                            if tx.send((job.doc, result)).is_err() {
                                break;
                            }
                        }
                    })
                    .map_err(|e| AnnError::internal(format!("spawn index worker: {e}")))?;
            }
            drop(job_rx);
            drop(result_tx);

            for (doc, stored) in self.docs.iter().enumerate() {
                job_tx
                    .send(Job {
                        doc,
                        vector: stored.vector.clone(),
                    })
                    .map_err(|_| ExecutionError::WorkerDisconnected)?;
            }
            // Close the queue: workers drain it and exit.
            drop(job_tx);
            Ok(())
        })?;

        let mut encodings: Vec<Option<Result<Vec<String>, ValidationError>>> =
            (0..self.docs.len()).map(|_| None).collect();
        for (doc, result) in result_rx.iter() {
            encodings[doc] = Some(result);
        }

        encodings
            .into_iter()
            .enumerate()
            .map(|(doc, slot)| match slot {
                Some(Ok(tokens)) => Ok(tokens),
                Some(Err(e)) => {
                    debug!(doc, id = %self.docs[doc].id, "document failed to encode");
                    Err(e.into())
                }
                None => Err(ExecutionError::WorkerDisconnected.into()),
            })
            .collect()
    }
}

/// Inverted index over one encoded vector field.
#[derive(Debug)]
pub struct VectorIndex {
    encoder: Arc<dyn VectorEncoder>,
    similarity: Similarity,
    docs: Vec<StoredDocument>,
    doc_lens: Vec<u32>,
    total_len: u64,
    postings: HashMap<String, Vec<Posting>>,
}

#[derive(Default)]
struct Accumulator {
    low_matches: usize,
    high_matches: usize,
    low_score: f64,
    high_score: f64,
}

impl VectorIndex {
    /// Opens the index directory at `dir`, encoding with `encoder`.
    pub fn open(
        dir: &Path,
        encoder: Arc<dyn VectorEncoder>,
        config: IndexBuilderConfig,
    ) -> AnnResult<Self> {
        let path = dir.join(VECTORS_FILE);
        info!(path = %dir.display(), "reading index");
        let file = File::open(&path).map_err(|e| AnnError::index_io(&path, &e))?;

        let mut builder = IndexBuilder::new(encoder, config);
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| AnnError::index_io(&path, &e))?;
            let Some((id, vector)) = split_line(&line) else {
                continue;
            };
            // Reject malformed rows up front so the error names the line.
            parse_row(vector, idx + 1)?;
            builder.add_text(id, vector);
        }
        builder.build()
    }

    /// Writes `entries` as an index directory at `dir`, creating it if needed.
    pub fn create<'a, I>(dir: &Path, entries: I) -> AnnResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        fs::create_dir_all(dir).map_err(|e| AnnError::index_io(dir, &e))?;
        let path = dir.join(VECTORS_FILE);
        let file = File::create(&path).map_err(|e| AnnError::index_io(&path, &e))?;
        let mut out = BufWriter::new(file);
        for (id, vector) in entries {
            writeln!(out, "{id} {}", format_vector(vector))
                .map_err(|e| AnnError::index_io(&path, &e))?;
        }
        out.flush().map_err(|e| AnnError::index_io(&path, &e))?;
        Ok(())
    }

    /// The encoder documents were indexed with.
    #[must_use]
    pub fn encoder(&self) -> &dyn VectorEncoder {
        self.encoder.as_ref()
    }

    /// Scoring model in use.
    #[must_use]
    pub const fn similarity(&self) -> Similarity {
        self.similarity
    }

    /// Stored documents in load order.
    #[must_use]
    pub fn documents(&self) -> &[StoredDocument] {
        &self.docs
    }

    /// Stored vectors whose identifier equals `id`.
    #[must_use]
    pub fn stored_vectors(&self, id: &str) -> Vec<&str> {
        self.docs
            .iter()
            .filter(|d| d.id == id)
            .map(|d| d.vector.as_str())
            .collect()
    }

    /// Executes `query`, returning at most `depth` hits by descending score.
    ///
    /// Equal scores keep document order.
    #[must_use]
    pub fn search(&self, query: &CommonTermsQuery, depth: usize) -> Vec<ScoredDocument> {
        if depth == 0 || query.field != FIELD_VECTOR {
            return Vec::new();
        }
        let tiers = query.partition(self);
        #[allow(clippy::cast_precision_loss)]
        let stats = ScoringStats {
            num_docs: self.docs.len() as u64,
            avg_doc_len: if self.docs.is_empty() {
                0.0
            } else {
                self.total_len as f64 / self.docs.len() as f64
            },
        };

        let mut acc: HashMap<u32, Accumulator> = HashMap::new();
        self.accumulate(&tiers.low, &stats, &mut acc, false);
        self.accumulate(&tiers.high, &stats, &mut acc, true);

        let mut hits: Vec<ScoredDocument> = acc
            .into_iter()
            .filter(|(_, a)| tiers.accepts(a.low_matches, a.high_matches))
            .map(|(doc, a)| {
                let mut score = a.low_score;
                if tiers.high_tier_scores(a.high_matches) {
                    score += a.high_score;
                }
                let doc = doc as usize;
                #[allow(clippy::cast_possible_truncation)]
                let score = score as f32;
                ScoredDocument {
                    doc,
                    id: self.docs[doc].id.clone(),
                    score,
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
        hits.truncate(depth);
        debug!(hits = hits.len(), terms = query.terms.len(), "search complete");
        hits
    }

    fn accumulate(
        &self,
        terms: &[WeightedTerm],
        stats: &ScoringStats,
        acc: &mut HashMap<u32, Accumulator>,
        high: bool,
    ) {
        for term in terms {
            let Some(postings) = self.postings.get(&term.term) else {
                continue;
            };
            for p in postings {
                let len = self.doc_lens[p.doc as usize];
                let s = f64::from(term.weight)
                    * self.similarity.score(stats, term.doc_freq, p.freq, len);
                let entry = acc.entry(p.doc).or_default();
                if high {
                    entry.high_matches += 1;
                    entry.high_score += s;
                } else {
                    entry.low_matches += 1;
                    entry.low_score += s;
                }
            }
        }
    }
}

impl TermStatistics for VectorIndex {
    fn doc_freq(&self, field: &str, term: &str) -> u64 {
        if field != FIELD_VECTOR {
            return 0;
        }
        self.postings.get(term).map_or(0, |p| p.len() as u64)
    }

    fn num_docs(&self) -> u64 {
        self.docs.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderConfig;
    use crate::fw::FakeWordsParams;
    use crate::query::QueryAssembler;

    fn fw_index(docs: &[(&str, &str)], workers: usize) -> VectorIndex {
        let encoder = EncoderConfig::FakeWords(FakeWordsParams { q: 10.0 })
            .build()
            .unwrap();
        let mut builder = IndexBuilder::new(
            encoder,
            IndexBuilderConfig {
                workers,
                queue_capacity: 2,
            },
        );
        for (id, v) in docs {
            builder.add_text(*id, *v);
        }
        builder.build().unwrap()
    }

    #[test]
    fn doc_freq_counts_documents_not_occurrences() {
        let index = fw_index(&[("a", "0.5 0.1"), ("b", "0.3 -0.2"), ("c", "-0.4 0.0")], 2);
        assert_eq!(index.num_docs(), 3);
        assert_eq!(index.doc_freq(FIELD_VECTOR, "+a"), 2);
        assert_eq!(index.doc_freq(FIELD_VECTOR, "-a"), 1);
        assert_eq!(index.doc_freq(FIELD_VECTOR, "+b"), 1);
        assert_eq!(index.doc_freq(FIELD_ID, "+a"), 0);
    }

    #[test]
    fn nearest_vector_ranks_first() {
        let index = fw_index(
            &[
                ("north", "0.9 0.0 0.0"),
                ("east", "0.0 0.9 0.0"),
                ("northeast", "0.6 0.6 0.0"),
                ("south", "-0.9 0.0 0.0"),
            ],
            3,
        );
        let q = QueryAssembler::new(1.0, 0.0)
            .unwrap()
            .assemble_vector(FIELD_VECTOR, index.encoder(), "0.8 0.1 0.0")
            .unwrap();
        let hits = index.search(&q, 10);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids[0], "north");
        assert!(!ids.contains(&"south"));
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn depth_truncates_results() {
        let index = fw_index(&[("a", "0.5"), ("b", "0.6"), ("c", "0.7")], 1);
        let q = QueryAssembler::new(1.0, 0.0)
            .unwrap()
            .assemble(FIELD_VECTOR, ["+a"])
            .unwrap();
        assert_eq!(index.search(&q, 2).len(), 2);
        assert!(index.search(&q, 0).is_empty());
    }

    #[test]
    fn other_fields_match_nothing() {
        let index = fw_index(&[("a", "0.5")], 1);
        let q = QueryAssembler::new(1.0, 0.0)
            .unwrap()
            .assemble("title", ["+a"])
            .unwrap();
        assert!(index.search(&q, 10).is_empty());
    }

    #[test]
    fn stored_vectors_are_verbatim() {
        let index = fw_index(&[("w", "0.50 -1e-1"), ("x", "0.2"), ("w", "0.3")], 2);
        assert_eq!(index.stored_vectors("w"), vec!["0.50 -1e-1", "0.3"]);
        assert!(index.stored_vectors("missing").is_empty());
    }

    #[test]
    fn encoding_error_fails_build() {
        let encoder = EncoderConfig::FakeWords(FakeWordsParams::default()).build().unwrap();
        let mut builder = IndexBuilder::new(encoder, IndexBuilderConfig::default());
        builder.add_text("ok", "0.1").add_text("bad", "0.1 inf");
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            AnnError::Validation(ValidationError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn empty_builder_builds_empty_index() {
        let index = fw_index(&[], 4);
        assert_eq!(index.num_docs(), 0);
        assert!(index.documents().is_empty());
    }

    #[test]
    fn similarity_follows_encoding() {
        assert_eq!(Similarity::for_encoding(Encoding::FakeWords), Similarity::Classic);
        assert_eq!(Similarity::for_encoding(Encoding::LexLsh), Similarity::Bm25);
    }
}
