//! reqwest-backed [`Backend`].

use async_trait::async_trait;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder};
use tracing::{instrument, trace};

use super::{cobalt, piped, AttemptError, AudioEncoding, Backend, Candidate};
use crate::registry::{Dialect, Provider};

/// Talks to Piped and Cobalt instances over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Send `request` and return the body of a 2xx response.
    async fn fetch_body(request: RequestBuilder, identity: &str) -> Result<Vec<u8>, AttemptError> {
        let response = request
            .header(USER_AGENT, identity)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        trace!(%status, "provider responded");
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip(self, identity), fields(provider = %provider))]
    async fn search(
        &self,
        provider: &Provider,
        query: &str,
        identity: &str,
    ) -> Result<Vec<Candidate>, AttemptError> {
        match provider.dialect {
            Dialect::Piped => {
                let url = piped::search_url(&provider.base_address, query);
                let body = Self::fetch_body(self.client.get(url), identity).await?;
                piped::parse_search(&body)
            }
            Dialect::Cobalt => Err(AttemptError::Unsupported(Dialect::Cobalt)),
        }
    }

    #[instrument(skip(self, identity), fields(provider = %provider))]
    async fn extract(
        &self,
        provider: &Provider,
        identifier: &str,
        identity: &str,
    ) -> Result<Vec<AudioEncoding>, AttemptError> {
        match provider.dialect {
            Dialect::Piped => {
                let url = piped::streams_url(&provider.base_address, identifier);
                let body = Self::fetch_body(self.client.get(url), identity).await?;
                piped::parse_streams(&body)
            }
            Dialect::Cobalt => {
                let request = self
                    .client
                    .post(&provider.base_address)
                    .json(&cobalt::request_body(identifier));
                let body = Self::fetch_body(request, identity).await?;
                cobalt::parse_response(&body)
            }
        }
    }
}
