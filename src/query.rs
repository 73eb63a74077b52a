//! Common-terms query construction.
//!
//! Encoded terms become a two-tier disjunction: terms that occur in more than
//! `cutoff` of all documents are high-frequency, the rest low-frequency. The
//! low tier decides which documents match; the high tier only adds score.
//! When every term is high-frequency the high tier decides instead.
//!
//! A [`CommonTermsQuery`] is a plain value keyed by the term multiset,
//! so token order never affects the query.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::encoder::VectorEncoder;
use crate::error::{AnnError, AnnResult, ExecutionError, ValidationError};

/// Minimum number of optional clauses that must match, per tier.
///
/// `0` disables the constraint. Values in `(0, 1)` are a fraction of the
/// tier's term count, rounded to the nearest integer; values `>= 1` are an
/// absolute count (fractional part truncated).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MinimumShouldMatch(f32);

impl MinimumShouldMatch {
    /// No constraint.
    pub const NONE: Self = Self(0.0);

    /// Validates `value` (finite, non-negative).
    pub fn new(value: f32) -> Result<Self, ValidationError> {
        if !value.is_finite() || value < 0.0 {
            return Err(ValidationError::invalid(
                "msm",
                format!("must be finite and >= 0, got {value}"),
            ));
        }
        Ok(Self(value))
    }

    /// Raw value.
    #[must_use]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// True when a constraint applies.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self.0 > 0.0
    }

    /// Required matches for a tier of `optional` terms.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn resolve(self, optional: usize) -> usize {
        if !self.is_enabled() {
            0
        } else if self.0 >= 1.0 {
            self.0 as usize
        } else {
            (f64::from(self.0) * optional as f64).round() as usize
        }
    }
}

/// Validates a document-frequency cutoff (`0 < cutoff <= 1`).
pub fn validate_cutoff(cutoff: f32) -> Result<(), ValidationError> {
    if cutoff.is_nan() || cutoff <= 0.0 || cutoff > 1.0 {
        return Err(ValidationError::invalid(
            "cutoff",
            format!("must be in (0, 1], got {cutoff}"),
        ));
    }
    Ok(())
}

/// A frequency-weighted common-terms query over one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonTermsQuery {
    /// Field the terms belong to.
    pub field: String,
    /// Term multiset: term → number of occurrences in the encoded vector.
    pub terms: BTreeMap<String, u32>,
    /// Document-frequency fraction above which a term is high-frequency.
    pub cutoff: f32,
    /// Minimum-should-match applied to both tiers.
    pub msm: MinimumShouldMatch,
}

impl CommonTermsQuery {
    /// Total number of term occurrences (multiset size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms
            .values()
            .fold(0usize, |acc, &n| acc.saturating_add(n as usize))
    }

    /// True when the query has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Validates a query built or deserialized outside [`QueryAssembler`].
    pub fn validate(&self) -> AnnResult<()> {
        if self.field.trim().is_empty() {
            return Err(ValidationError::missing("field").into());
        }
        validate_cutoff(self.cutoff)?;
        MinimumShouldMatch::new(self.msm.value())?;
        if self.terms.is_empty() {
            return Err(ExecutionError::EmptyQuery.into());
        }
        Ok(())
    }

    /// Splits the terms into frequency tiers using `stats`.
    #[must_use]
    pub fn partition(&self, stats: &dyn TermStatistics) -> TieredQuery {
        let num_docs = stats.num_docs();
        let mut low = Vec::new();
        let mut high = Vec::new();

        for (term, &weight) in &self.terms {
            let doc_freq = stats.doc_freq(&self.field, term);
            let entry = WeightedTerm {
                term: term.clone(),
                weight,
                doc_freq,
            };
            #[allow(clippy::cast_precision_loss)]
            let is_high =
                num_docs > 0 && (doc_freq as f64 / num_docs as f64) > f64::from(self.cutoff);
            if is_high {
                high.push(entry);
            } else {
                low.push(entry);
            }
        }

        let low_min_match = self.msm.resolve(low.len());
        let high_min_match = self.msm.resolve(high.len());
        TieredQuery {
            low,
            high,
            low_min_match,
            high_min_match,
        }
    }
}

/// Document statistics needed to partition a query.
pub trait TermStatistics {
    /// Number of documents containing `term` in `field`.
    fn doc_freq(&self, field: &str, term: &str) -> u64;

    /// Number of documents in the collection.
    fn num_docs(&self) -> u64;
}

/// A query term with its query-side weight and collection frequency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedTerm {
    /// The term.
    pub term: String,
    /// Occurrences in the encoded query vector.
    pub weight: u32,
    /// Documents containing the term.
    pub doc_freq: u64,
}

/// A [`CommonTermsQuery`] resolved against collection statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TieredQuery {
    /// Low-frequency terms.
    pub low: Vec<WeightedTerm>,
    /// High-frequency terms.
    pub high: Vec<WeightedTerm>,
    /// Matches required in the low tier (0 = unconstrained).
    pub low_min_match: usize,
    /// Matches required in the high tier (0 = unconstrained).
    pub high_min_match: usize,
}

impl TieredQuery {
    /// Whether a document matching `low_matches` low-tier and `high_matches`
    /// high-tier terms is a hit.
    #[must_use]
    pub fn accepts(&self, low_matches: usize, high_matches: usize) -> bool {
        if self.low.is_empty() {
            high_matches >= self.high_min_match.max(1)
        } else {
            low_matches >= self.low_min_match.max(1)
        }
    }

    /// Whether the high tier contributes score for a matching document.
    #[must_use]
    pub fn high_tier_scores(&self, high_matches: usize) -> bool {
        high_matches >= self.high_min_match.max(1)
    }
}

/// Builds [`CommonTermsQuery`] values with fixed cutoff and msm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryAssembler {
    cutoff: f32,
    msm: MinimumShouldMatch,
}

impl QueryAssembler {
    /// Validates `cutoff` and `msm`.
    pub fn new(cutoff: f32, msm: f32) -> Result<Self, ValidationError> {
        validate_cutoff(cutoff)?;
        Ok(Self {
            cutoff,
            msm: MinimumShouldMatch::new(msm)?,
        })
    }

    /// Configured cutoff.
    #[must_use]
    pub const fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Configured msm.
    #[must_use]
    pub const fn msm(&self) -> MinimumShouldMatch {
        self.msm
    }

    /// Builds a query for `field` from an encoded token multiset.
    ///
    /// Fails with `EmptyQuery` if `tokens` is empty.
    pub fn assemble<I, S>(&self, field: &str, tokens: I) -> AnnResult<CommonTermsQuery>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if field.trim().is_empty() {
            return Err(ValidationError::missing("field").into());
        }
        let mut terms: BTreeMap<String, u32> = BTreeMap::new();
        for token in tokens {
            let count = terms.entry(token.into()).or_default();
            *count = count.saturating_add(1);
        }
        if terms.is_empty() {
            return Err(ExecutionError::EmptyQuery.into());
        }
        Ok(CommonTermsQuery {
            field: field.to_string(),
            terms,
            cutoff: self.cutoff,
            msm: self.msm,
        })
    }

    /// Encodes `vector` with `encoder` and builds the query.
    pub fn assemble_vector(
        &self,
        field: &str,
        encoder: &dyn VectorEncoder,
        vector: &str,
    ) -> AnnResult<CommonTermsQuery> {
        let tokens = encoder.encode(vector)?;
        self.assemble(field, tokens)
    }
}

/// Serialize a query to pretty JSON.
pub fn to_json_pretty(query: &CommonTermsQuery) -> AnnResult<String> {
    serde_json::to_string_pretty(query)
        .map_err(|e| AnnError::internal(format!("serialize query: {e}")))
}

/// Deserialize and validate a query from JSON.
pub fn from_json(s: &str) -> AnnResult<CommonTermsQuery> {
    let query = serde_json::from_str::<CommonTermsQuery>(s)
        .map_err(|e| AnnError::internal(format!("deserialize query: {e}")))?;
    query.validate()?;
    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Stats {
        num_docs: u64,
        df: HashMap<&'static str, u64>,
    }

    impl TermStatistics for Stats {
        fn doc_freq(&self, _field: &str, term: &str) -> u64 {
            self.df.get(term).copied().unwrap_or(0)
        }

        fn num_docs(&self) -> u64 {
            self.num_docs
        }
    }

    fn assembler(cutoff: f32, msm: f32) -> QueryAssembler {
        QueryAssembler::new(cutoff, msm).unwrap()
    }

    #[test]
    fn assemble_counts_duplicates() {
        let q = assembler(0.5, 0.0)
            .assemble("vector", ["+a", "+a", "-b", "+a"])
            .unwrap();
        assert_eq!(q.terms.get("+a"), Some(&3));
        assert_eq!(q.terms.get("-b"), Some(&1));
        assert_eq!(q.len(), 4);
    }

    #[test]
    fn assemble_ignores_order() {
        let a = assembler(0.01, 2.0).assemble("v", ["x", "y", "y", "z"]).unwrap();
        let b = assembler(0.01, 2.0).assemble("v", ["y", "z", "x", "y"]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn len_sums_large_counts_without_overflow() {
        let mut q = assembler(0.5, 0.0).assemble("v", ["x"]).unwrap();
        q.terms.insert("x".to_string(), u32::MAX);
        q.terms.insert("y".to_string(), u32::MAX);
        assert_eq!(q.len(), 2 * u32::MAX as usize);
    }

    #[test]
    fn empty_tokens_fail() {
        let err = assembler(0.5, 0.0)
            .assemble("v", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, AnnError::Execution(ExecutionError::EmptyQuery)));
    }

    #[test]
    fn blank_field_fails() {
        let err = assembler(0.5, 0.0).assemble(" ", ["x"]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn cutoff_must_be_in_unit_interval() {
        assert!(QueryAssembler::new(0.0, 0.0).is_err());
        assert!(QueryAssembler::new(1.5, 0.0).is_err());
        assert!(QueryAssembler::new(f32::NAN, 0.0).is_err());
        assert!(QueryAssembler::new(1.0, 0.0).is_ok());
        assert!(QueryAssembler::new(0.999, 0.0).is_ok());
    }

    #[test]
    fn msm_must_be_non_negative() {
        assert!(QueryAssembler::new(0.5, -1.0).is_err());
        assert!(QueryAssembler::new(0.5, f32::INFINITY).is_err());
    }

    #[test]
    fn msm_absolute_and_fractional() {
        assert_eq!(MinimumShouldMatch::NONE.resolve(10), 0);
        assert_eq!(MinimumShouldMatch::new(2.0).unwrap().resolve(5), 2);
        assert_eq!(MinimumShouldMatch::new(2.7).unwrap().resolve(5), 2);
        assert_eq!(MinimumShouldMatch::new(0.5).unwrap().resolve(5), 3);
        assert_eq!(MinimumShouldMatch::new(0.4).unwrap().resolve(5), 2);
        assert_eq!(MinimumShouldMatch::new(1.0).unwrap().resolve(0), 1);
    }

    #[test]
    fn partition_splits_on_cutoff() {
        let stats = Stats {
            num_docs: 100,
            df: HashMap::from([("common", 50), ("rare", 1), ("edge", 10)]),
        };
        let q = assembler(0.1, 0.0)
            .assemble("v", ["common", "rare", "edge", "unseen"])
            .unwrap();
        let tiers = q.partition(&stats);
        let high: Vec<&str> = tiers.high.iter().map(|t| t.term.as_str()).collect();
        let low: Vec<&str> = tiers.low.iter().map(|t| t.term.as_str()).collect();
        assert_eq!(high, vec!["common"]);
        // df/N == cutoff stays low-frequency.
        assert_eq!(low, vec!["edge", "rare", "unseen"]);
    }

    #[test]
    fn msm_applies_to_both_tiers() {
        let stats = Stats {
            num_docs: 10,
            df: HashMap::from([("h1", 9), ("h2", 9)]),
        };
        let q = assembler(0.5, 2.0)
            .assemble("v", ["h1", "h2", "t1", "t2", "t3"])
            .unwrap();
        let tiers = q.partition(&stats);
        assert_eq!(tiers.low_min_match, 2);
        assert_eq!(tiers.high_min_match, 2);
        assert!(!tiers.accepts(1, 2));
        assert!(tiers.accepts(2, 0));
        assert!(!tiers.high_tier_scores(1));
        assert!(tiers.high_tier_scores(2));
    }

    #[test]
    fn all_high_frequency_requires_high_tier() {
        let stats = Stats {
            num_docs: 10,
            df: HashMap::from([("h1", 10), ("h2", 10)]),
        };
        let q = assembler(0.5, 0.0).assemble("v", ["h1", "h2"]).unwrap();
        let tiers = q.partition(&stats);
        assert!(tiers.low.is_empty());
        assert!(!tiers.accepts(0, 0));
        assert!(tiers.accepts(0, 1));
    }

    #[test]
    fn json_roundtrip_validates() {
        let q = assembler(0.01, 0.5).assemble("vector", ["a_kd", "a_kd", "b_ct"]).unwrap();
        let json = to_json_pretty(&q).unwrap();
        assert_eq!(from_json(&json).unwrap(), q);

        let empty = r#"{"field": "vector", "terms": {}, "cutoff": 0.5, "msm": 0.0}"#;
        assert!(from_json(empty).is_err());
    }
}
