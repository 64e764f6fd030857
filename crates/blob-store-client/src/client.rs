//! HTTP client for the remote blob store

use crate::error::{BlobStoreError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

/// File extension of every object the store holds
pub const CANONICAL_EXTENSION: &str = "webp";
/// MIME type sent with every upload
pub const CANONICAL_MIME: &str = "image/webp";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the proxy needs from the store of record
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upload canonical bytes under `token`, returning the stored object name
    async fn upload(&self, data: Vec<u8>, token: &str) -> Result<String>;

    /// Fetch a previously stored object by name
    async fn fetch(&self, name: &str) -> Result<Vec<u8>>;
}

/// Client for the blob store's `/upload` and `/i/{name}` endpoints
pub struct BlobStoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BlobStoreClient {
    /// Create a client with the default request timeout
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteStore for BlobStoreClient {
    async fn upload(&self, data: Vec<u8>, token: &str) -> Result<String> {
        let name = format!("{}.{}", token, CANONICAL_EXTENSION);
        let url = format!("{}/upload", self.base_url);
        let size = data.len();

        let part = Part::bytes(data)
            .file_name(name.clone())
            .mime_str(CANONICAL_MIME)?;
        let form = Form::new().part("file", part);

        debug!(url = %url, name = %name, size, "Uploading blob");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), url = %url, "Blob upload rejected");
            return Err(BlobStoreError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        debug!(name = %name, "Uploaded blob");
        Ok(name)
    }

    async fn fetch(&self, name: &str) -> Result<Vec<u8>> {
        let url = format!("{}/i/{}", self.base_url, name);

        debug!(url = %url, "Fetching blob");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), url = %url, "Failed to fetch blob");
            return Err(BlobStoreError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let data = response.bytes().await?.to_vec();
        debug!(name, size = data.len(), "Fetched blob");
        Ok(data)
    }
}
