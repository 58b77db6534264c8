//! Sequential provider failover.
//!
//! Providers are tried strictly one at a time, in registry order. Every
//! provider-side fault (transport error, deadline, refusal, bad status,
//! malformed or empty body) is logged and absorbed; the caller only sees
//! the first success or an [`ExhaustionError`].

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::backend::{AttemptError, AudioEncoding, Backend, Candidate};
use crate::fingerprint::random_identity;
use crate::registry::{OperationKind, Provider, ProviderRegistry};

/// Picks the User-Agent for one attempt.
pub type IdentityPicker = Arc<dyn Fn() -> &'static str + Send + Sync>;

/// Every provider for `kind` failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("all {attempts} providers exhausted for {kind}")]
pub struct ExhaustionError {
    pub kind: OperationKind,
    pub attempts: usize,
}

/// A successful payload and the provider that produced it.
#[derive(Debug, Clone)]
pub struct Attempted<T> {
    pub provider: Provider,
    pub payload: T,
}

/// Runs operations against the registry with per-attempt deadlines.
#[derive(Clone)]
pub struct FailoverController {
    registry: Arc<ProviderRegistry>,
    identity: IdentityPicker,
}

impl FailoverController {
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            identity: Arc::new(random_identity),
        }
    }

    #[must_use]
    pub fn with_identity(mut self, identity: IdentityPicker) -> Self {
        self.identity = identity;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Try `op` against each provider for `kind` until one succeeds.
    ///
    /// `op` receives the provider and the identity to present. Each call
    /// is bounded by the provider's `per_attempt_timeout`; a late result
    /// is dropped with its future. A provider is never retried.
    pub async fn attempt_operation<T, F, Fut>(
        &self,
        kind: OperationKind,
        mut op: F,
    ) -> Result<Attempted<T>, ExhaustionError>
    where
        F: FnMut(Provider, &'static str) -> Fut,
        Fut: Future<Output = Result<T, AttemptError>>,
    {
        let providers = self.registry.providers_for(kind);

        for (index, provider) in providers.iter().enumerate() {
            if !provider.dialect.supports(kind) {
                log_failure(kind, provider, &AttemptError::Unsupported(provider.dialect));
                continue;
            }

            let identity = (self.identity)();
            debug!(%kind, %provider, attempt = index + 1, "trying provider");

            let outcome =
                match tokio::time::timeout(provider.per_attempt_timeout, op(provider.clone(), identity)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(AttemptError::Timeout(provider.per_attempt_timeout)),
                };

            match outcome {
                Ok(payload) => {
                    info!(%kind, %provider, "provider succeeded");
                    return Ok(Attempted {
                        provider: provider.clone(),
                        payload,
                    });
                }
                Err(err) => log_failure(kind, provider, &err),
            }
        }

        Err(ExhaustionError {
            kind,
            attempts: providers.len(),
        })
    }

    /// Search for `query`, succeeding on the first provider that yields at
    /// least one playable candidate. Up to `limit` playable candidates are
    /// returned in upstream order.
    pub async fn search(
        &self,
        backend: &dyn Backend,
        query: &str,
        limit: usize,
    ) -> Result<Attempted<Vec<Candidate>>, ExhaustionError> {
        let limit = limit.max(1);
        self.attempt_operation(OperationKind::Search, move |provider, identity| async move {
            let candidates: Vec<Candidate> = backend
                .search(&provider, query, identity)
                .await?
                .into_iter()
                .filter(Candidate::is_playable)
                .take(limit)
                .collect();

            if candidates.is_empty() {
                Err(AttemptError::Empty("no playable candidates"))
            } else {
                Ok(candidates)
            }
        })
        .await
    }

    /// Extract encodings for `identifier`, succeeding on the first provider
    /// that yields at least one encoding with a non-empty address.
    pub async fn extract_encodings(
        &self,
        backend: &dyn Backend,
        identifier: &str,
    ) -> Result<Attempted<Vec<AudioEncoding>>, ExhaustionError> {
        self.attempt_operation(OperationKind::Extract, move |provider, identity| async move {
            let encodings: Vec<AudioEncoding> = backend
                .extract(&provider, identifier, identity)
                .await?
                .into_iter()
                .filter(|e| !e.url.is_empty())
                .collect();

            if encodings.is_empty() {
                Err(AttemptError::Empty("no audio encodings"))
            } else {
                Ok(encodings)
            }
        })
        .await
    }
}

fn log_failure(kind: OperationKind, provider: &Provider, err: &AttemptError) {
    match err {
        AttemptError::Transport(_) | AttemptError::Timeout(_) => {
            warn!(%kind, %provider, error = %err, "provider unreachable");
        }
        _ if err.is_refusal() => {
            warn!(%kind, %provider, error = %err, "provider refused request");
        }
        _ => {
            debug!(%kind, %provider, error = %err, "provider gave no usable payload");
        }
    }
}
