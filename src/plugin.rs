//! Query-parser plugin for a host search engine.
//!
//! The host initializes the plugin once with string parameters and then asks
//! it to parse each request's local parameters (`qf` field, `v` vector) into a
//! [`CommonTermsQuery`]. The plugin holds an immutable encoder, so one
//! instance serves concurrent requests without synchronization.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoder::{EncoderConfig, Encoding, VectorEncoder};
use crate::error::{AnnError, AnnResult, ValidationError};
use crate::fw::{FakeWordsParams, DEFAULT_Q};
use crate::lexlsh::LexLshParams;
use crate::query::{CommonTermsQuery, QueryAssembler};
use crate::search::DEFAULT_DEPTH;

/// Default high-frequency cutoff for plugin queries.
pub const DEFAULT_PLUGIN_CUTOFF: f32 = 0.01;

/// Local parameter naming the query field.
pub const PARAM_FIELD: &str = "qf";

/// Local parameter carrying the textual vector.
pub const PARAM_VECTOR: &str = "v";

/// Read access to host parameters.
pub trait Params {
    /// Raw value for `key`.
    fn get(&self, key: &str) -> Option<&str>;
}

impl Params for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        HashMap::get(self, key).map(String::as_str)
    }
}

impl Params for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<&str> {
        BTreeMap::get(self, key).map(String::as_str)
    }
}

/// Host error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// The request is malformed.
    BadRequest,
    /// The plugin failed.
    ServerError,
}

impl ErrorCode {
    /// HTTP-style status code.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::ServerError => 500,
        }
    }
}

/// Error reported to the host.
#[derive(Debug, Error)]
#[error("{code:?} ({status}): {message}", status = .code.status())]
pub struct PluginError {
    /// Category.
    pub code: ErrorCode,
    /// Description.
    pub message: String,
}

impl From<AnnError> for PluginError {
    fn from(err: AnnError) -> Self {
        let code = if err.is_bad_request() {
            ErrorCode::BadRequest
        } else {
            ErrorCode::ServerError
        };
        Self {
            code,
            message: err.to_string(),
        }
    }
}

/// Plugin initialization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Encoding scheme.
    pub analyzer: Encoding,
    /// Fake Words quantization factor.
    pub q: f32,
    /// Retrieval depth hint for the host.
    pub depth: usize,
    /// High-frequency cutoff.
    pub cutoff: f32,
    /// Minimum-should-match.
    pub msm: f32,
    /// LexLSH parameters (used when `analyzer` is `lexlsh`).
    pub lexlsh: LexLshParams,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            analyzer: Encoding::FakeWords,
            q: DEFAULT_Q,
            depth: DEFAULT_DEPTH,
            cutoff: DEFAULT_PLUGIN_CUTOFF,
            msm: 0.0,
            lexlsh: LexLshParams::default(),
        }
    }
}

fn parse_param<T: FromStr>(params: &dyn Params, key: &str) -> Result<Option<T>, ValidationError>
where
    T::Err: std::fmt::Display,
{
    params
        .get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| ValidationError::invalid(key, format!("'{raw}': {e}")))
        })
        .transpose()
}

impl PluginConfig {
    /// Reads parameters over the defaults; absent keys keep their default.
    ///
    /// Recognized keys: `analyzer`, `q`, `depth`, `cutoff`, `msm`, and
    /// `lexlsh.d`, `lexlsh.n`, `lexlsh.h`, `lexlsh.b`, `lexlsh.hsize`.
    pub fn from_params(params: &dyn Params) -> Result<Self, ValidationError> {
        let mut config = Self::default();
        if let Some(analyzer) = params.get("analyzer") {
            config.analyzer = analyzer.trim().parse()?;
        }
        if let Some(q) = parse_param(params, "q")? {
            config.q = q;
        }
        if let Some(depth) = parse_param(params, "depth")? {
            config.depth = depth;
        }
        if let Some(cutoff) = parse_param(params, "cutoff")? {
            config.cutoff = cutoff;
        }
        if let Some(msm) = parse_param(params, "msm")? {
            config.msm = msm;
        }
        let l = &mut config.lexlsh;
        if let Some(d) = parse_param(params, "lexlsh.d")? {
            l.decimals = d;
        }
        if let Some(n) = parse_param(params, "lexlsh.n")? {
            l.ngrams = n;
        }
        if let Some(h) = parse_param(params, "lexlsh.h")? {
            l.hash_count = h;
        }
        if let Some(b) = parse_param(params, "lexlsh.b")? {
            l.bucket_count = b;
        }
        if let Some(s) = parse_param(params, "lexlsh.hsize")? {
            l.hash_set_size = s;
        }
        Ok(config)
    }

    /// Encoder configuration selected by `analyzer`.
    #[must_use]
    pub const fn encoder_config(&self) -> EncoderConfig {
        match self.analyzer {
            Encoding::FakeWords => EncoderConfig::FakeWords(FakeWordsParams { q: self.q }),
            Encoding::LexLsh => EncoderConfig::LexLsh(self.lexlsh),
        }
    }
}

/// Approximate nearest-neighbor query parser.
#[derive(Debug, Clone)]
pub struct AnnQueryParserPlugin {
    config: PluginConfig,
    encoder: Arc<dyn VectorEncoder>,
    assembler: QueryAssembler,
}

impl AnnQueryParserPlugin {
    /// Initializes from host parameters.
    pub fn init(params: &dyn Params) -> AnnResult<Self> {
        Self::with_config(PluginConfig::from_params(params)?)
    }

    /// Initializes from a typed configuration.
    pub fn with_config(config: PluginConfig) -> AnnResult<Self> {
        let encoder = config.encoder_config().build()?;
        let assembler = QueryAssembler::new(config.cutoff, config.msm)?;
        Ok(Self {
            config,
            encoder,
            assembler,
        })
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Retrieval depth hint.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.config.depth
    }

    /// Parses one request.
    ///
    /// `qf` and `v` are mandatory; their absence, a malformed vector, or a
    /// vector that encodes to no terms is a `BadRequest`.
    pub fn parse(&self, local_params: &dyn Params) -> Result<CommonTermsQuery, PluginError> {
        let field = local_params
            .get(PARAM_FIELD)
            .ok_or_else(|| AnnError::from(ValidationError::missing(PARAM_FIELD)))?;
        let vector = local_params
            .get(PARAM_VECTOR)
            .ok_or_else(|| AnnError::from(ValidationError::missing(PARAM_VECTOR)))?;

        Ok(self
            .assembler
            .assemble_vector(field, self.encoder.as_ref(), vector)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_host_conventions() {
        let config = PluginConfig::from_params(&params(&[])).unwrap();
        assert_eq!(config.analyzer, Encoding::FakeWords);
        assert!((config.q - 60.0).abs() < f32::EPSILON);
        assert_eq!(config.depth, 10);
        assert!((config.cutoff - 0.01).abs() < f32::EPSILON);
        assert!(config.msm.abs() < f32::EPSILON);
    }

    #[test]
    fn parses_overrides() {
        let config = PluginConfig::from_params(&params(&[
            ("analyzer", "LEXLSH"),
            ("depth", "25"),
            ("msm", "0.5"),
            ("lexlsh.b", "26"),
            ("lexlsh.h", "3"),
        ]))
        .unwrap();
        assert_eq!(config.analyzer, Encoding::LexLsh);
        assert_eq!(config.depth, 25);
        assert_eq!(config.lexlsh.bucket_count, 26);
        assert_eq!(config.lexlsh.hash_count, 3);
        assert!(matches!(config.encoder_config(), EncoderConfig::LexLsh(_)));
    }

    #[test]
    fn unparseable_value_is_invalid_parameter() {
        let err = PluginConfig::from_params(&params(&[("q", "lots")])).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidParameter { ref name, .. } if name == "q"));
    }

    #[test]
    fn unknown_analyzer_is_rejected() {
        let err = AnnQueryParserPlugin::init(&params(&[("analyzer", "pq")])).unwrap_err();
        assert!(matches!(
            err,
            AnnError::Validation(ValidationError::UnknownEncoding { .. })
        ));
    }

    #[test]
    fn missing_local_params_are_bad_requests() {
        let plugin = AnnQueryParserPlugin::init(&params(&[])).unwrap();

        let err = plugin.parse(&params(&[("v", "0.5")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert!(err.message.contains("qf"));

        let err = plugin.parse(&params(&[("qf", "vector")])).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert!(err.message.contains("'v'"));
    }

    #[test]
    fn error_display_includes_status() {
        let err = PluginError {
            code: ErrorCode::ServerError,
            message: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "ServerError (500): boom");
    }
}
