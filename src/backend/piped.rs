//! Piped API dialect.
//!
//! - search: `GET {base}/search?q={query}&filter=music_songs`
//! - streams: `GET {base}/streams/{videoId}`

use serde::Deserialize;

use super::{AttemptError, AudioEncoding, Candidate, Container};

/// Piped marks live items with a duration of `-1`.
const LIVE_DURATION: i64 = -1;

pub fn search_url(base: &str, query: &str) -> String {
    format!(
        "{base}/search?q={}&filter=music_songs",
        urlencoding::encode(query)
    )
}

pub fn streams_url(base: &str, identifier: &str) -> String {
    format!("{base}/streams/{}", urlencoding::encode(identifier))
}

/// Decode a search response body.
///
/// `items` is required; individual items may lack any field, in which
/// case they decode to non-playable candidates and are filtered later.
pub fn parse_search(body: &[u8]) -> Result<Vec<Candidate>, AttemptError> {
    let response: SearchResponse = serde_json::from_slice(body)?;

    Ok(response
        .items
        .into_iter()
        .filter(|item| item.kind.as_deref().is_none_or(|kind| kind == "stream"))
        .map(SearchItem::into_candidate)
        .collect())
}

/// Decode a streams response body into audio encodings.
///
/// `audioStreams` is required. Entries without a URL are dropped.
pub fn parse_streams(body: &[u8]) -> Result<Vec<AudioEncoding>, AttemptError> {
    let response: StreamsResponse = serde_json::from_slice(body)?;

    Ok(response
        .audio_streams
        .into_iter()
        .filter_map(PipedAudioStream::into_encoding)
        .collect())
}

/// Pull the `v` parameter out of `/watch?v=ID`.
fn video_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse("https://piped.invalid")
        .and_then(|base| base.join(url))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    url: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<String>,
    thumbnail: Option<String>,
    uploader_name: Option<String>,
    duration: Option<i64>,
}

impl SearchItem {
    fn into_candidate(self) -> Candidate {
        let identifier = self
            .url
            .as_deref()
            .and_then(video_id_from_url)
            .unwrap_or_default();

        Candidate {
            identifier,
            title: self.title.unwrap_or_default(),
            is_live: self.duration == Some(LIVE_DURATION),
            duration_seconds: self.duration.and_then(|d| u64::try_from(d).ok()),
            artist: self.uploader_name,
            thumbnail: self.thumbnail,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamsResponse {
    audio_streams: Vec<PipedAudioStream>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PipedAudioStream {
    url: Option<String>,
    format: Option<String>,
    mime_type: Option<String>,
    codec: Option<String>,
    bitrate: Option<u64>,
}

impl PipedAudioStream {
    fn into_encoding(self) -> Option<AudioEncoding> {
        let url = self.url.filter(|u| !u.is_empty())?;
        let container = self
            .format
            .as_deref()
            .and_then(Container::from_format)
            .or_else(|| self.mime_type.as_deref().map(Container::from_mime))
            .unwrap_or(Container::Other);

        Some(AudioEncoding {
            url,
            container,
            bitrate_bps: self.bitrate.unwrap_or(0),
            mime_type: self.mime_type,
            codec: self.codec,
        })
    }
}
