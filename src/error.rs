//! Error types for lexann.
//!
//! All errors in lexann are strongly typed using thiserror.
//! This enables pattern matching on specific error conditions
//! and provides clear error messages.

use thiserror::Error;

/// Validation errors raised while reading vectors or parameters.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid vector format: component {position} ('{literal}') is not a number")]
    InvalidVectorFormat {
        position: usize,
        literal: String,
    },

    #[error("Invalid vector at line {line}: component {position} ('{literal}') is not a number")]
    InvalidVectorRow {
        line: usize,
        position: usize,
        literal: String,
    },

    #[error("Non-finite value {value} at dimension {dimension}")]
    NonFiniteValue {
        dimension: usize,
        value: f32,
    },

    #[error("Value {value} at dimension {dimension} exceeds {limit} repetitions")]
    RepetitionLimit {
        dimension: usize,
        value: f32,
        limit: u64,
    },

    #[error("Unknown encoding '{name}': must be one of {{fw, lexlsh}}")]
    UnknownEncoding {
        name: String,
    },

    #[error("Required parameter '{name}' is missing")]
    MissingParameter {
        name: String,
    },

    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::MissingParameter`].
    #[must_use]
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingParameter { name: name.into() }
    }

    /// Shorthand for [`ValidationError::InvalidParameter`].
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Execution errors raised while assembling or running a query.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Encoder produced no tokens for the query vector")]
    EmptyQuery,

    #[error("Index I/O error at {path}: {message}")]
    IndexIo {
        path: String,
        message: String,
    },

    #[error("No vector found for word '{word}'")]
    WordNotFound {
        word: String,
    },

    #[error("Index worker pool disconnected")]
    WorkerDisconnected,
}

/// Top-level error type for lexann.
#[derive(Debug, Error)]
pub enum AnnError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AnnError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates an index I/O error for `path`.
    #[must_use]
    pub fn index_io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::Execution(ExecutionError::IndexIo {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the caller's input is at fault.
    ///
    /// Hosts map these to a bad-request category; everything else is a
    /// server-side failure.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Execution(e) => matches!(
                e,
                ExecutionError::EmptyQuery | ExecutionError::WordNotFound { .. }
            ),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for lexann operations.
pub type AnnResult<T> = Result<T, AnnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_vector_format_message() {
        let err = ValidationError::InvalidVectorFormat {
            position: 1,
            literal: "foo".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("foo"));
        assert!(msg.contains("component 1"));
    }

    #[test]
    fn test_invalid_vector_row_names_line() {
        let err = ValidationError::InvalidVectorRow {
            line: 7,
            position: 2,
            literal: "x".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("line 7"));
        assert!(msg.contains("component 2"));
    }

    #[test]
    fn test_repetition_limit_message() {
        let err = ValidationError::RepetitionLimit {
            dimension: 0,
            value: 1e38,
            limit: 65_536,
        };
        let msg = format!("{err}");
        assert!(msg.contains("dimension 0"));
        assert!(msg.contains("65536"));
    }

    #[test]
    fn test_non_finite_value_message() {
        let err = ValidationError::NonFiniteValue {
            dimension: 3,
            value: f32::INFINITY,
        };
        let msg = format!("{err}");
        assert!(msg.contains("dimension 3"));
        assert!(msg.contains("inf"));
    }

    #[test]
    fn test_unknown_encoding_message() {
        let err = ValidationError::UnknownEncoding {
            name: "pq".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("'pq'"));
        assert!(msg.contains("{fw, lexlsh}"));
    }

    #[test]
    fn test_index_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = AnnError::index_io("/tmp/idx", &io);
        assert!(err.is_execution());
        assert!(!err.is_bad_request());
        let msg = format!("{err}");
        assert!(msg.contains("/tmp/idx"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_ann_error_from_validation() {
        let err: AnnError = ValidationError::missing("qf").into();
        assert!(err.is_validation());
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_empty_query_is_bad_request() {
        let err: AnnError = ExecutionError::EmptyQuery.into();
        assert!(err.is_execution());
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_ann_error_internal() {
        let err = AnnError::internal("unexpected state");
        assert!(err.is_internal());
        assert!(!err.is_bad_request());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
