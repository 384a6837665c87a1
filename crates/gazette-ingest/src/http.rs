//! Reqwest-backed implementation of the [`HttpFetcher`] contract.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, IF_MODIFIED_SINCE, USER_AGENT};
use std::time::Duration;
use url::Url;

use gazette_core::{Error, HttpFetcher, Result};

const GAZETTE_USER_AGENT: &str = "Mozilla/5.0 (compatible; GazetteFeedReader/1.0)";

/// Timeout for conditional update checks; kept short because only headers
/// matter.
const CONDITIONAL_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for full body downloads (feed XML, entry content).
const BODY_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client for feed checks, feed downloads, and entry content
/// fetches. Connection-pooled and safe for concurrent use.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Build a client with the Gazette user agent, gzip, and a bounded
    /// redirect policy.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(GAZETTE_USER_AGENT));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connect_timeout(Duration::from_secs(5))
            .timeout(BODY_TIMEOUT)
            .build()
            .map_err(|e| Error::Fetch(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn conditional_get(&self, url: &Url, if_modified_since: &str) -> Result<u16> {
        let header = HeaderValue::from_str(if_modified_since)
            .map_err(|e| Error::Fetch(format!("bad If-Modified-Since value: {e}")))?;
        let response = self
            .client
            .get(url.clone())
            .header(IF_MODIFIED_SINCE, header)
            .timeout(CONDITIONAL_TIMEOUT)
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        Ok(response.status().as_u16())
    }

    async fn get_text(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }
        response
            .text()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))
    }

    async fn get_bytes(&self, url: &Url) -> Result<Bytes> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!(
                "GET {url} returned {}",
                response.status()
            )));
        }
        response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))
    }
}
