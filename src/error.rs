//! Resolution error taxonomy.

use thiserror::Error;

use crate::failover::ExhaustionError;
use crate::relay::RelayError;

/// Everything a resolution or proxy request can fail with.
///
/// Per-provider faults never appear here: the failover controller absorbs
/// them and only its aggregate exhaustion is mapped to `NotFound` (search)
/// or `ServiceUnavailable` (stream-extraction).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("either a query or a video id is required")]
    InvalidInput,

    #[error("no playable result for {query:?}")]
    NotFound { query: String },

    #[error("audio unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("extraction engine is still starting")]
    NotReady,

    #[error("relay failed: {0}")]
    Relay(#[from] RelayError),
}

impl ResolveError {
    /// Stable machine-readable classification.
    pub fn code(&self) -> &'static str {
        match self {
            ResolveError::InvalidInput => "invalid_input",
            ResolveError::NotFound { .. } => "not_found",
            ResolveError::ServiceUnavailable(_) => "service_unavailable",
            ResolveError::NotReady => "not_ready",
            ResolveError::Relay(_) => "relay_failure",
        }
    }

    /// Whether the same request may succeed shortly without changes.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolveError::NotReady)
    }

    pub(crate) fn search_exhausted(query: &str) -> Self {
        ResolveError::NotFound {
            query: query.to_string(),
        }
    }

    pub(crate) fn extraction_exhausted(err: &ExhaustionError) -> Self {
        ResolveError::ServiceUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationKind;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            ResolveError::InvalidInput,
            ResolveError::NotFound { query: "q".into() },
            ResolveError::ServiceUnavailable("x".into()),
            ResolveError::NotReady,
            ResolveError::Relay(RelayError::Status(500)),
        ];
        let mut codes: Vec<_> = errors.iter().map(ResolveError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn only_not_ready_is_retryable() {
        assert!(ResolveError::NotReady.is_retryable());
        assert!(!ResolveError::ServiceUnavailable("x".into()).is_retryable());
        assert!(!ResolveError::InvalidInput.is_retryable());
    }

    #[test]
    fn extraction_exhaustion_names_operation() {
        let err = ResolveError::extraction_exhausted(&ExhaustionError {
            kind: OperationKind::Extract,
            attempts: 3,
        });
        assert_eq!(
            err.to_string(),
            "audio unavailable: all 3 providers exhausted for stream-extraction"
        );
    }
}
