//! Remote image retrieval for scraped recipes.

use crate::config::ImportConfig;
use crate::error::{BarbackError, Result};
use std::time::Duration;
use tracing::debug;

/// Fetches raw image bytes by URL.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking HTTP fetcher with a timeout and a response size limit.
pub struct HttpImageFetcher {
    client: reqwest::blocking::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// Build a client with the default timeout and size limit.
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(ImportConfig::FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            max_bytes: ImportConfig::MAX_IMAGE_BYTES,
        })
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| BarbackError::validation("image.url", format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BarbackError::validation(
                "image.url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }

        let response = self.client.get(parsed).send()?.error_for_status()?;
        let bytes = response.bytes()?;
        if bytes.len() > self.max_bytes {
            return Err(BarbackError::validation(
                "image.url",
                format!("Image too large: {} bytes (max {})", bytes.len(), self.max_bytes),
            ));
        }

        debug!(url, bytes = bytes.len(), "Fetched image");
        Ok(bytes.to_vec())
    }
}
