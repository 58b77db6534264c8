//! Backend trait and common types.
//!
//! A [`Backend`] performs exactly one operation (search or
//! stream-extraction) against exactly one [`Provider`]. It does not retry
//! and does not know about other providers; that is the job of the
//! [`FailoverController`](crate::failover::FailoverController).
//!
//! Upstream payloads are decoded into explicit schemas ([`piped`],
//! [`cobalt`]). A missing or mistyped required field is reported as
//! [`AttemptError::Malformed`] instead of being carried forward.

pub mod cobalt;
pub mod http;
pub mod piped;

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::registry::{Dialect, Provider};

pub use http::HttpBackend;

/// One search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(rename = "videoId")]
    pub identifier: String,
    pub title: String,
    #[serde(skip)]
    pub is_live: bool,
    pub duration_seconds: Option<u64>,
    pub artist: Option<String>,
    pub thumbnail: Option<String>,
}

impl Candidate {
    /// Live streams and entries without an identifier are never playable.
    pub fn is_playable(&self) -> bool {
        !self.is_live && !self.identifier.is_empty()
    }
}

/// Container class of an audio encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Container {
    M4a,
    Webm,
    Other,
}

impl Container {
    /// Classify from a Piped `format` tag (`M4A`, `WEBMA_OPUS`, ...).
    pub fn from_format(format: &str) -> Option<Self> {
        let format = format.to_ascii_uppercase();
        if format == "M4A" {
            Some(Container::M4a)
        } else if format.starts_with("WEBM") {
            Some(Container::Webm)
        } else {
            None
        }
    }

    /// Classify from a media type such as `audio/mp4; codecs="mp4a.40.2"`.
    pub fn from_mime(mime: &str) -> Self {
        match essence(mime).to_ascii_lowercase().as_str() {
            "audio/mp4" | "audio/m4a" | "audio/x-m4a" => Container::M4a,
            "audio/webm" => Container::Webm,
            _ => Container::Other,
        }
    }

    fn default_mime(self) -> &'static str {
        match self {
            Container::M4a => "audio/mp4",
            Container::Webm => "audio/webm",
            Container::Other => "application/octet-stream",
        }
    }
}

/// One concrete downloadable audio representation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioEncoding {
    pub url: String,
    pub container: Container,
    pub bitrate_bps: u64,
    pub mime_type: Option<String>,
    pub codec: Option<String>,
}

impl AudioEncoding {
    pub fn new(url: impl Into<String>, container: Container, bitrate_bps: u64) -> Self {
        Self {
            url: url.into(),
            container,
            bitrate_bps,
            mime_type: None,
            codec: None,
        }
    }

    /// Media type announced to the client when relaying this encoding.
    pub fn content_type(&self) -> &str {
        match self.mime_type.as_deref().map(essence) {
            Some(mime) if !mime.is_empty() => mime,
            _ => self.container.default_mime(),
        }
    }
}

fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or(mime).trim()
}

/// Why a single provider attempt did not produce a usable payload.
///
/// These never leave the failover controller; callers only see the
/// aggregate exhaustion.
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no usable payload: {0}")]
    Empty(&'static str),

    #[error("{0:?} providers do not support this operation")]
    Unsupported(Dialect),
}

impl AttemptError {
    /// 429 and 403: the instance is throttling or blocking us.
    pub fn is_refusal(&self) -> bool {
        matches!(self, AttemptError::Status(429 | 403))
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AttemptError::Malformed(err.to_string())
        } else if let Some(status) = err.status() {
            AttemptError::Status(status.as_u16())
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AttemptError {
    fn from(err: serde_json::Error) -> Self {
        AttemptError::Malformed(err.to_string())
    }
}

/// A search/extraction backend reachable at a [`Provider`]'s address.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Search `provider` for `query`, returning items in upstream order.
    async fn search(
        &self,
        provider: &Provider,
        query: &str,
        identity: &str,
    ) -> Result<Vec<Candidate>, AttemptError>;

    /// Extract the audio encodings available for `identifier`.
    async fn extract(
        &self,
        provider: &Provider,
        identifier: &str,
        identity: &str,
    ) -> Result<Vec<AudioEncoding>, AttemptError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_or_anonymous_candidates_are_not_playable() {
        let mut candidate = Candidate {
            identifier: "dQw4w9WgXcQ".into(),
            title: "Song".into(),
            is_live: false,
            duration_seconds: Some(212),
            artist: None,
            thumbnail: None,
        };
        assert!(candidate.is_playable());

        candidate.is_live = true;
        assert!(!candidate.is_playable());

        candidate.is_live = false;
        candidate.identifier.clear();
        assert!(!candidate.is_playable());
    }

    #[test]
    fn container_from_piped_format() {
        assert_eq!(Container::from_format("M4A"), Some(Container::M4a));
        assert_eq!(Container::from_format("WEBMA_OPUS"), Some(Container::Webm));
        assert_eq!(Container::from_format("WEBMA"), Some(Container::Webm));
        assert_eq!(Container::from_format("MP3"), None);
    }

    #[test]
    fn container_from_mime() {
        assert_eq!(Container::from_mime("audio/mp4; codecs=\"mp4a.40.2\""), Container::M4a);
        assert_eq!(Container::from_mime("audio/webm; codecs=\"opus\""), Container::Webm);
        assert_eq!(Container::from_mime("audio/mpeg"), Container::Other);
    }

    #[test]
    fn content_type_prefers_declared_mime() {
        let mut encoding = AudioEncoding::new("https://a/1", Container::Webm, 160_000);
        assert_eq!(encoding.content_type(), "audio/webm");

        encoding.mime_type = Some("audio/webm; codecs=\"opus\"".into());
        assert_eq!(encoding.content_type(), "audio/webm");

        encoding.mime_type = Some("audio/ogg".into());
        assert_eq!(encoding.content_type(), "audio/ogg");

        let other = AudioEncoding::new("https://a/2", Container::Other, 0);
        assert_eq!(other.content_type(), "application/octet-stream");
    }

    #[test]
    fn refusals_are_429_and_403() {
        assert!(AttemptError::Status(429).is_refusal());
        assert!(AttemptError::Status(403).is_refusal());
        assert!(!AttemptError::Status(500).is_refusal());
        assert!(!AttemptError::Transport("refused".into()).is_refusal());
    }
}
