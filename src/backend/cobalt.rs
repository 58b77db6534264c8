//! Cobalt API dialect (extraction only).
//!
//! `POST {base}` with `{ url, downloadMode: "audio" }`; the answer carries a
//! single direct media URL and no format metadata.

use serde::Deserialize;
use serde_json::{json, Value};

use super::{AttemptError, AudioEncoding, Container};

pub fn watch_url(identifier: &str) -> String {
    format!(
        "https://www.youtube.com/watch?v={}",
        urlencoding::encode(identifier)
    )
}

pub fn request_body(identifier: &str) -> Value {
    json!({
        "url": watch_url(identifier),
        "downloadMode": "audio",
        "vCodec": "none",
    })
}

/// Decode a Cobalt response into at most one encoding.
pub fn parse_response(body: &[u8]) -> Result<Vec<AudioEncoding>, AttemptError> {
    let response: CobaltResponse = serde_json::from_slice(body)?;

    if response.status.as_deref() == Some("error") {
        return Ok(Vec::new());
    }

    Ok(response
        .url
        .filter(|url| !url.is_empty())
        .map(|url| AudioEncoding::new(url, Container::Other, 0))
        .into_iter()
        .collect())
}

#[derive(Debug, Deserialize)]
struct CobaltResponse {
    status: Option<String>,
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_names_watch_url() {
        let body = request_body("abc123");
        assert_eq!(body["url"], "https://www.youtube.com/watch?v=abc123");
        assert_eq!(body["downloadMode"], "audio");
    }

    #[test]
    fn parse_tunnel_response() {
        let encodings =
            parse_response(br#"{"status": "tunnel", "url": "https://cobalt/tunnel?id=1"}"#).unwrap();
        assert_eq!(encodings.len(), 1);
        assert_eq!(encodings[0].container, Container::Other);
        assert_eq!(encodings[0].bitrate_bps, 0);
    }

    #[test]
    fn parse_error_response_is_empty() {
        let encodings =
            parse_response(br#"{"status": "error", "error": {"code": "error.api.youtube.login"}}"#)
                .unwrap();
        assert!(encodings.is_empty());
    }

    #[test]
    fn parse_non_json_is_malformed() {
        assert!(matches!(
            parse_response(b"Bad Gateway").unwrap_err(),
            AttemptError::Malformed(_)
        ));
    }
}
