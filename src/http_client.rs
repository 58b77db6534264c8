//! Upstream HTTP clients.
//!
//! Both clients are pooled reqwest clients. No total request timeout is
//! set: provider attempts carry their own deadline and relayed media
//! bodies stream for the full length of a track.

use std::time::Duration;

use anyhow::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, ClientBuilder};

use crate::fingerprint::IDENTITIES;

fn base_builder() -> ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

    Client::builder()
        // Keep connections alive for reuse
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        // Lower time-to-first-byte on the relay path
        .tcp_nodelay(true)
        .use_rustls_tls()
        .default_headers(headers)
        // Overridden per attempt
        .user_agent(IDENTITIES[0])
        .connect_timeout(Duration::from_secs(10))
        .redirect(reqwest::redirect::Policy::limited(10))
}

/// Client for provider API calls (JSON, compressed).
pub fn api_client() -> Result<Client> {
    Ok(base_builder().brotli(true).gzip(true).build()?)
}

/// Client for media origins. Compression stays off so byte ranges refer
/// to the object itself.
pub fn media_client() -> Result<Client> {
    Ok(base_builder().brotli(false).gzip(false).build()?)
}
