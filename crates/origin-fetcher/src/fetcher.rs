//! Origin requests with scheme fallback and a bounded body read

use crate::error::{FetchError, Result};
use reqwest::header::{HeaderMap, CONTENT_TYPE, HOST};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// Hard ceiling on a downloaded body: 100 MiB
pub const DEFAULT_MAX_BODY_BYTES: u64 = 100 * 1024 * 1024;

/// Required prefix of the origin's declared content type
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for fetching source images from origins
#[derive(Debug, Clone)]
pub struct OriginFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl OriginFetcher {
    /// Create a fetcher with the default 100 MiB ceiling
    pub fn new() -> Result<Self> {
        Self::with_max_body_bytes(DEFAULT_MAX_BODY_BYTES)
    }

    /// Create a fetcher with a custom download ceiling
    pub fn with_max_body_bytes(max_body_bytes: u64) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }

    /// Fetch a JPEG from `source` (`host[:port]/path`, no scheme).
    ///
    /// Every inbound header except `Host` is forwarded with all of its values
    /// in their original order. https is tried first; a transport failure is
    /// retried exactly once over http.
    pub async fn fetch(&self, source: &str, headers: &HeaderMap) -> Result<Vec<u8>> {
        let response = self.send(source, headers).await?;
        let url = response.url().to_string();

        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url));
        }

        if !response.status().is_success() {
            warn!(status = %response.status(), url = %url, "Origin returned error status");
            return Err(FetchError::OriginStatus(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.starts_with(JPEG_CONTENT_TYPE) {
            return Err(FetchError::UnsupportedMedia(content_type));
        }

        let data = read_limited(response, self.max_body_bytes).await?;
        debug!(url = %url, size = data.len(), "Fetched JPEG from origin");
        Ok(data)
    }

    async fn send(&self, source: &str, headers: &HeaderMap) -> Result<Response> {
        let secure_url = format!("https://{}", source);
        debug!(url = %secure_url, "Requesting origin");

        match self.request(&secure_url, headers).send().await {
            Ok(response) => Ok(response),
            Err(err) if is_transport_failure(&err) => {
                let plain_url = format!("http://{}", source);
                warn!(
                    url = %secure_url,
                    error = %err,
                    "https request failed, retrying over http"
                );
                Ok(self.request(&plain_url, headers).send().await?)
            }
            Err(err) => Err(FetchError::InvalidRequest(Box::new(err))),
        }
    }

    fn request(&self, url: &str, headers: &HeaderMap) -> RequestBuilder {
        headers
            .iter()
            .filter(|(name, _)| **name != HOST)
            .fold(self.client.get(url), |request, (name, value)| {
                request.header(name.clone(), value.clone())
            })
    }
}

/// Failures worth retrying over the other scheme. Builder errors are not.
fn is_transport_failure(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout() || err.is_request()
}

/// Buffer the body, failing once it grows past `limit` bytes.
async fn read_limited(mut response: Response, limit: u64) -> Result<Vec<u8>> {
    let declared = response.content_length();
    if declared.is_some_and(|len| len > limit) {
        return Err(FetchError::TooLarge { limit });
    }

    let mut body = Vec::with_capacity(declared.unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await? {
        if (body.len() + chunk.len()) as u64 > limit {
            return Err(FetchError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}
