// Network transport for the cache controller.
// The `Fetcher` seam lets the controller run against reqwest or a scripted fake.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderValue, USER_AGENT},
};
use tracing::debug;
use url::Url;

use crate::error::{CacheError, Result};

use super::request::{Request, Response, ResponseKind};

/// Performs a request against the network.
///
/// Only transport failures are errors; any HTTP status is a successful fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// reqwest-backed transport for a single application origin.
pub struct HttpFetcher {
    client: Client,
    origin: Url,
}

impl HttpFetcher {
    pub fn new(origin: Url) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("rustyclint-cache/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(CacheError::Http)?;

        Ok(Self { client, origin })
    }

    fn kind_for(&self, url: &Url) -> ResponseKind {
        if url.origin() == self.origin.origin() {
            ResponseKind::Basic
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        debug!(method = %request.method, url = %request.url, "Fetching from network");

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| CacheError::Network {
                url: request.url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        debug!(status = %status, url = %url, size = body.len(), "Fetched from network");

        Ok(Response {
            status,
            kind: self.kind_for(&url),
            url,
            headers,
            body,
        })
    }
}
