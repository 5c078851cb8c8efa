// =============================================================================
// fetcher.rs — ONE GET, ONE CHANCE
// =============================================================================
//
// A page either comes back as text within the timeout, or the caller gets a
// FetchError and decides what to skip. No retries, no cookies, no cache.
// Exchanges occasionally answer scrapers with a 403 and a captcha page;
// that is a non-2xx and gets reported like any other failure.
// =============================================================================

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::FetchError;

#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Raw document text of `url`, or the reason it could not be had.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed fetcher with a bounded timeout and a descriptive User-Agent.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url = url, "GET");

        let response = self.client.get(url).send().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        debug!(url = url, bytes = body.len(), "Fetched document");
        Ok(body)
    }
}
