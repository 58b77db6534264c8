//! HTTP interface.
//!
//! - `GET  /`                 liveness banner
//! - `GET  /health`           engine state
//! - `POST /audio`            resolution endpoint
//! - `GET  /search`           candidate list
//! - `GET  /stream/{videoId}` streaming proxy
//!
//! Handlers stay thin and delegate to [`Resolver`].

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::backend::Candidate;
use crate::error::ResolveError;
use crate::relay::{self, RelayError, RelayReceiver};
use crate::resolver::{ResolutionRequest, Resolver};

/// Chunks buffered between the relay task and the response body.
const RELAY_CHANNEL_CAPACITY: usize = 16;

/// Seconds a client should wait before retrying a not-ready engine.
const RETRY_AFTER_SECS: &str = "2";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

/// Build the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/audio", post(resolve_audio))
        .route("/search", get(search))
        .route("/stream/{video_id}", get(stream_audio))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

/// [`ResolveError`] rendered as `{ success: false, error, message }`.
pub struct ApiError(pub ResolveError);

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ResolveError::InvalidInput => StatusCode::BAD_REQUEST,
            ResolveError::NotFound { .. } => StatusCode::NOT_FOUND,
            ResolveError::ServiceUnavailable(_) => StatusCode::BAD_GATEWAY,
            ResolveError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            ResolveError::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.0.code(),
            "message": self.0.to_string(),
            "retryable": self.0.is_retryable(),
        }));
        let mut response = (self.status(), body).into_response();
        if self.0.is_retryable() {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AudioRequest {
    query: Option<String>,
    video_id: Option<String>,
    limit: Option<usize>,
    /// Answer with a proxy endpoint instead of the upstream URL.
    #[serde(default)]
    proxy: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioResponse {
    success: bool,
    video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    q: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    success: bool,
    candidates: Vec<Candidate>,
}

/// Proxy path for a resolved identifier.
pub fn stream_endpoint(video_id: &str) -> String {
    format!("/stream/{}", urlencoding::encode(video_id))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn banner() -> impl IntoResponse {
    Json(json!({ "status": "Vibra API OK" }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "engine": state.resolver.engine().state().as_str(),
    }))
}

#[instrument(skip_all)]
async fn resolve_audio(
    State(state): State<AppState>,
    payload: Result<Json<AudioRequest>, JsonRejection>,
) -> Result<Json<AudioResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(error = %rejection, "unreadable resolution request");
        ResolveError::InvalidInput
    })?;

    let request = ResolutionRequest {
        query: payload.query,
        video_id: payload.video_id,
        limit: payload.limit,
    };
    let resolution = state.resolver.resolve(&request).await?;
    let video_id = resolution.stream.identifier;

    let (url, stream_endpoint) = if payload.proxy {
        (None, Some(stream_endpoint(&video_id)))
    } else {
        (Some(resolution.stream.chosen_encoding.url), None)
    };

    Ok(Json(AudioResponse {
        success: true,
        video_id,
        url,
        stream_endpoint,
        candidates: resolution.candidates,
    }))
}

#[instrument(skip_all)]
async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(params) = params.map_err(|_| ResolveError::InvalidInput)?;
    let query = params.q.ok_or(ResolveError::InvalidInput)?;

    let candidates = state
        .resolver
        .search(&query, params.limit.unwrap_or(10))
        .await?;

    Ok(Json(SearchResponse {
        success: true,
        candidates,
    }))
}

/// Streaming proxy.
///
/// The relay runs in its own task and feeds the body through a channel.
/// The handler waits for the head and the first body item: a relay that
/// fails before its first byte becomes a clean JSON error, anything later
/// truncates the stream.
#[instrument(skip(state))]
async fn stream_audio(State(state): State<AppState>, Path(video_id): Path<String>) -> Response {
    let (mut sink, receiver) = relay::channel(RELAY_CHANNEL_CAPACITY);
    let resolver = Arc::clone(&state.resolver);
    let task = tokio::spawn(async move { resolver.open_stream(&video_id, &mut sink).await });

    let RelayReceiver { head, mut body } = receiver;

    let Ok(head) = head.await else {
        // Sink dropped without a head: resolution failed.
        return match task.await {
            Ok(Err(err)) => ApiError(err).into_response(),
            Ok(Ok(_)) => ApiError(ResolveError::Relay(RelayError::Body("relay ended before announcing".into()))).into_response(),
            Err(join) => ApiError(ResolveError::Relay(RelayError::Body(join.to_string()))).into_response(),
        };
    };

    let first: Option<Bytes> = match body.recv().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(err)) => return ApiError(ResolveError::Relay(err)).into_response(),
        None => None,
    };

    let rest = stream::unfold(body, |mut body| async move {
        body.recv().await.map(|item| (item, body))
    });
    let chunks = stream::iter(first.into_iter().map(Ok::<Bytes, RelayError>)).chain(rest);

    let mut response = Response::new(Body::from_stream(chunks));
    *response.headers_mut() = head.headers();
    response
}
