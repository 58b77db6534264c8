//! Resolution pipeline.
//!
//! query ─search─▶ identifier ─extract─▶ encodings ─select─▶ encoding
//!                                                         └─relay─▶ sink
//!
//! Each step runs through the failover controller; steps never overlap.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::backend::{AudioEncoding, Candidate};
use crate::engine::{Engine, Lifecycle};
use crate::error::{ResolveError, Result};
use crate::failover::FailoverController;
use crate::registry::Provider;
use crate::relay::{self, RelayOutcome, RelaySink, DEFAULT_PREFIX_BYTES};
use crate::select::select_best;

/// Upper bound for candidate lists.
pub const MAX_LIMIT: usize = 50;

/// What the caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionRequest {
    pub query: Option<String>,
    pub video_id: Option<String>,
    /// Also return up to this many candidates (query form only).
    pub limit: Option<usize>,
}

impl ResolutionRequest {
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Self::default()
        }
    }

    pub fn for_video(video_id: impl Into<String>) -> Self {
        Self {
            video_id: Some(video_id.into()),
            ..Self::default()
        }
    }
}

/// Terminal artifact of the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub identifier: String,
    pub chosen_encoding: AudioEncoding,
    /// Provider that produced the encodings.
    pub provider: Provider,
}

/// A resolved stream plus the candidates seen on the way.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub stream: ResolvedStream,
    /// Present only when a query was searched and a limit was given.
    pub candidates: Option<Vec<Candidate>>,
}

enum Target<'a> {
    Video(&'a str),
    Query(&'a str),
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Clamp a caller-supplied limit to `1..=MAX_LIMIT`.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// Stateless per request; shared by all handlers.
pub struct Resolver {
    controller: FailoverController,
    engine: Arc<Lifecycle<Engine>>,
    prefix_bytes: u64,
}

impl Resolver {
    pub fn new(controller: FailoverController, engine: Arc<Lifecycle<Engine>>) -> Self {
        Self {
            controller,
            engine,
            prefix_bytes: DEFAULT_PREFIX_BYTES,
        }
    }

    #[must_use]
    pub fn with_prefix_bytes(mut self, prefix_bytes: u64) -> Self {
        self.prefix_bytes = prefix_bytes.max(1);
        self
    }

    pub fn engine(&self) -> &Lifecycle<Engine> {
        &self.engine
    }

    pub fn controller(&self) -> &FailoverController {
        &self.controller
    }

    /// Resolve `request` to a playable encoding.
    ///
    /// A video id wins over a query. Input is validated before the engine
    /// or any provider is consulted.
    #[instrument(skip(self))]
    pub async fn resolve(&self, request: &ResolutionRequest) -> Result<Resolution> {
        let target = match (non_blank(request.video_id.as_ref()), non_blank(request.query.as_ref())) {
            (Some(id), _) => Target::Video(id),
            (None, Some(query)) => Target::Query(query),
            (None, None) => return Err(ResolveError::InvalidInput),
        };
        let engine = self.engine.get()?;

        let (identifier, candidates) = match target {
            Target::Video(id) => (id.to_string(), None),
            Target::Query(query) => {
                let limit = request.limit.map_or(1, clamp_limit);
                let candidates = self.search_with(&engine, query, limit).await?;
                let identifier = candidates[0].identifier.clone();
                let candidates = request.limit.map(|_| candidates);
                (identifier, candidates)
            }
        };

        let stream = self.resolve_with(&engine, &identifier).await?;
        Ok(Resolution { stream, candidates })
    }

    /// Up to `limit` playable candidates for `query`.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::InvalidInput);
        }
        let engine = self.engine.get()?;
        self.search_with(&engine, query, clamp_limit(limit)).await
    }

    /// Extract and select the best encoding for a known identifier.
    #[instrument(skip(self))]
    pub async fn resolve_identifier(&self, identifier: &str) -> Result<ResolvedStream> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(ResolveError::InvalidInput);
        }
        let engine = self.engine.get()?;
        self.resolve_with(&engine, identifier).await
    }

    /// Re-resolve `identifier` and relay its best encoding into `sink`.
    ///
    /// Resolution failures happen before anything is announced to the
    /// sink; relay failures after that are reported through the sink too.
    #[instrument(skip(self, sink))]
    pub async fn open_stream<S>(&self, identifier: &str, sink: &mut S) -> Result<RelayOutcome>
    where
        S: RelaySink + ?Sized,
    {
        let stream = self.resolve_identifier(identifier).await?;
        let engine = self.engine.get()?;
        let outcome = relay::relay(
            engine.origin.as_ref(),
            &stream.chosen_encoding,
            self.prefix_bytes,
            sink,
        )
        .await?;
        Ok(outcome)
    }

    async fn search_with(&self, engine: &Engine, query: &str, limit: usize) -> Result<Vec<Candidate>> {
        let found = self
            .controller
            .search(engine.backend.as_ref(), query, limit)
            .await
            .map_err(|_| ResolveError::search_exhausted(query))?;
        debug!(provider = %found.provider, count = found.payload.len(), "search resolved");
        Ok(found.payload)
    }

    async fn resolve_with(&self, engine: &Engine, identifier: &str) -> Result<ResolvedStream> {
        let extracted = self
            .controller
            .extract_encodings(engine.backend.as_ref(), identifier)
            .await
            .map_err(|err| ResolveError::extraction_exhausted(&err))?;

        let chosen = select_best(&extracted.payload)
            .cloned()
            .ok_or_else(|| ResolveError::ServiceUnavailable("no audio encoding available".into()))?;

        info!(
            identifier,
            provider = %extracted.provider,
            container = ?chosen.container,
            bitrate = chosen.bitrate_bps,
            "stream resolved"
        );

        Ok(ResolvedStream {
            identifier: identifier.to_string(),
            chosen_encoding: chosen,
            provider: extracted.provider,
        })
    }
}
