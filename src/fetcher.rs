//! Resource fetching over HTTP(S)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use tracing::{debug, warn};

use crate::error::FetchError;

const USER_AGENT: &str = concat!("image_cache/", env!("CARGO_PKG_VERSION"));

/// Raw bytes of a fetched resource plus the media type the origin declared.
#[derive(Debug, Clone)]
pub struct FetchedResource {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Retrieves a resource's bytes given its key.
///
/// Implementations perform no retries; a failed fetch is reported and the
/// caller decides whether to try again.
#[async_trait]
pub trait ResourceFetcher: Send + Sync + 'static {
    async fn fetch(&self, key: &str) -> Result<FetchedResource, FetchError>;
}

/// Fetches resources with a shared reqwest client
pub struct HttpFetcher {
    client: Client,
    max_bytes: usize,
}

impl HttpFetcher {
    /// Create a fetcher with a per-request timeout and body size limit
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client, max_bytes })
    }

    fn parse_url(key: &str) -> Result<Url, FetchError> {
        let url = Url::parse(key).map_err(|e| FetchError::InvalidUrl(format!("{key}: {e}")))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(FetchError::InvalidUrl(format!(
                "{key}: unsupported scheme {other}"
            ))),
        }
    }
}

#[async_trait]
impl ResourceFetcher for HttpFetcher {
    async fn fetch(&self, key: &str) -> Result<FetchedResource, FetchError> {
        let url = Self::parse_url(key)?;
        debug!(url = %url, "Fetching resource");

        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), url = key, "Origin rejected fetch");
            return Err(FetchError::Status {
                url: key.to_string(),
                status: response.status().as_u16(),
            });
        }

        if let Some(length) = response.content_length() {
            let length = usize::try_from(length).unwrap_or(usize::MAX);
            if length > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size: length,
                    limit: self.max_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Content-Length may be absent (chunked), so the limit is enforced
        // while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let size = bytes.len() + chunk.len();
            if size > self.max_bytes {
                return Err(FetchError::TooLarge {
                    size,
                    limit: self.max_bytes,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        debug!(
            size = bytes.len(),
            content_type = content_type.as_deref().unwrap_or("-"),
            "Fetched resource"
        );

        Ok(FetchedResource {
            bytes,
            content_type,
        })
    }
}

/// Fetcher whose origin is always down. Keeps unit tests off the network.
#[cfg(test)]
pub(crate) struct OfflineFetcher;

#[cfg(test)]
#[async_trait]
impl ResourceFetcher for OfflineFetcher {
    async fn fetch(&self, key: &str) -> Result<FetchedResource, FetchError> {
        Err(FetchError::Status {
            url: key.to_string(),
            status: 503,
        })
    }
}
