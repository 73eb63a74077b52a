//! # lexann - Approximate nearest neighbors over inverted indexes
//!
//! lexann turns dense vectors (word embeddings and the like) into bags of
//! synthetic terms so that an ordinary full-text engine, scoring by term
//! overlap with IDF weighting, can retrieve approximate nearest neighbors.
//!
//! ## Encoders
//!
//! - **Fake Words** ([`fw`]): each dimension becomes a sign-tagged "fake word"
//!   repeated `floor(|v| * q)` times.
//! - **LexLSH** ([`lexlsh`]): each dimension becomes a rounded lexical
//!   fingerprint, which is shingled, min-hash sampled and projected into
//!   alphabetic bucket labels over several hash rounds.
//!
//! Encoded terms are wrapped into a [`CommonTermsQuery`] by the
//! [`QueryAssembler`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lexann::{EncoderConfig, Encoding, QueryAssembler};
//!
//! let encoder = EncoderConfig::defaults(Encoding::LexLsh).build()?;
//! let query = QueryAssembler::new(0.01, 0.0)?
//!     .assemble_vector("vector", encoder.as_ref(), "0.12 -0.48 0.03")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Encoding core
pub mod alphabet;
pub mod encoder;
pub mod error;
pub mod fw;
pub mod hash;
pub mod lexlsh;
pub mod query;
pub mod vector;

// Model loading, reference index and drivers
pub mod index;
pub mod model;
pub mod plugin;
pub mod search;

// Re-export primary types at crate root for convenience
pub use encoder::{EncoderConfig, Encoding, TokenStream, VectorEncoder};
pub use error::{AnnError, AnnResult, ExecutionError, ValidationError};
pub use fw::{FakeWordsEncoder, FakeWordsParams};
pub use hash::LEXLSH_HASH_VERSION;
pub use lexlsh::{LexLshEncoder, LexLshParams};
pub use query::{CommonTermsQuery, MinimumShouldMatch, QueryAssembler, TermStatistics};
pub use vector::{RawFeature, VectorTokenizer};

pub use index::{IndexBuilder, IndexBuilderConfig, ScoredDocument, Similarity, VectorIndex};
pub use model::{read_glove, WordVectors};
pub use plugin::{AnnQueryParserPlugin, ErrorCode, PluginConfig, PluginError};
pub use search::{SearchReport, SearchRequest, Searcher, VectorSource};
