//! Vector encoders.
//!
//! An encoder turns a textual vector into a stream of synthetic terms that an
//! inverted index can score by overlap. Encoders are immutable once built and
//! are shared across threads behind `Arc<dyn VectorEncoder>`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValidationError;
use crate::fw::{FakeWordsEncoder, FakeWordsParams};
use crate::lexlsh::{LexLshEncoder, LexLshParams};

/// Pull-based stream of encoded terms.
pub type TokenStream<'a> = Box<dyn Iterator<Item = Result<String, ValidationError>> + 'a>;

/// Encoding scheme names accepted on the command line and by the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// Fake Words quantization.
    #[serde(rename = "fw")]
    FakeWords,
    /// Lexical locality-sensitive hashing.
    #[serde(rename = "lexlsh")]
    LexLsh,
}

impl Encoding {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FakeWords => "fw",
            Self::LexLsh => "lexlsh",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ValidationError;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("fw") {
            Ok(Self::FakeWords)
        } else if s.eq_ignore_ascii_case("lexlsh") {
            Ok(Self::LexLsh)
        } else {
            Err(ValidationError::UnknownEncoding { name: s.to_string() })
        }
    }
}

/// Converts a textual vector into terms.
pub trait VectorEncoder: Send + Sync + fmt::Debug {
    /// The scheme this encoder implements.
    fn encoding(&self) -> Encoding;

    /// Lazily encodes `vector`.
    ///
    /// The stream ends after the first error.
    fn tokens<'a>(&'a self, vector: &'a str) -> TokenStream<'a>;

    /// Encodes `vector` into an owned token list.
    fn encode(&self, vector: &str) -> Result<Vec<String>, ValidationError> {
        let tokens = self.tokens(vector).collect::<Result<Vec<_>, _>>()?;
        debug!(encoding = %self.encoding(), tokens = tokens.len(), "encoded vector");
        Ok(tokens)
    }
}

/// Serializable encoder configuration.
///
/// ```json
/// {"encoding": "lexlsh", "decimals": 1, "ngrams": 2, "hash_count": 1, "bucket_count": 300, "hash_set_size": 1}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding")]
pub enum EncoderConfig {
    /// Fake Words with the given parameters.
    #[serde(rename = "fw")]
    FakeWords(FakeWordsParams),
    /// LexLSH with the given parameters.
    #[serde(rename = "lexlsh")]
    LexLsh(LexLshParams),
}

impl EncoderConfig {
    /// Default parameters for `encoding`.
    #[must_use]
    pub fn defaults(encoding: Encoding) -> Self {
        match encoding {
            Encoding::FakeWords => Self::FakeWords(FakeWordsParams::default()),
            Encoding::LexLsh => Self::LexLsh(LexLshParams::default()),
        }
    }

    /// The configured scheme.
    #[must_use]
    pub const fn encoding(&self) -> Encoding {
        match self {
            Self::FakeWords(_) => Encoding::FakeWords,
            Self::LexLsh(_) => Encoding::LexLsh,
        }
    }

    /// Validates the parameters and builds a shareable encoder.
    pub fn build(&self) -> Result<Arc<dyn VectorEncoder>, ValidationError> {
        Ok(match *self {
            Self::FakeWords(params) => Arc::new(FakeWordsEncoder::new(params)?),
            Self::LexLsh(params) => Arc::new(LexLshEncoder::new(params)?),
        })
    }
}
