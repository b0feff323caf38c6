//! Thin client for the external blob storage service.
//!
//! Blob storage itself is an external collaborator; this wrapper only
//! uploads bytes under a unique object name and hands back the public URL.
//! Unlike the document stores, upload failures propagate: the caller needs
//! to know the clip never made it off the device.

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::error::{StoreError, StoreResult};

/// Blob service configuration.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    /// Base URL of the blob service bucket
    pub base_url: String,
    /// Optional bearer token
    pub api_token: Option<String>,
}

impl BlobConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Ok(Self {
            base_url: std::env::var("BLOB_BASE_URL")
                .map_err(|_| StoreError::config_error("BLOB_BASE_URL not set"))?,
            api_token: std::env::var("BLOB_API_TOKEN").ok(),
        })
    }
}

/// HTTP client for blob uploads.
#[derive(Clone)]
pub struct BlobClient {
    http: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl BlobClient {
    /// Create a new blob client from configuration.
    pub fn new(config: BlobConfig) -> StoreResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            http: Client::new(),
            base_url,
            api_token: config.api_token,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(BlobConfig::from_env()?)
    }

    /// Upload a clip and return its public URL.
    ///
    /// The object name is prefixed with a filesystem-safe timestamp so
    /// repeated uploads of the same filename never collide.
    pub async fn upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StoreResult<String> {
        let object_name = unique_object_name(filename, Utc::now());
        let url = self.base_url.join(&object_name)?;

        let mut request = self
            .http
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(StoreError::upload_failed(format!(
                "blob service returned {} for {object_name}",
                response.status()
            )));
        }

        info!(%url, "uploaded clip to blob storage");
        Ok(url.to_string())
    }
}

/// Build a unique, filesystem-safe object name from a timestamp and the
/// caller's filename.
pub fn unique_object_name(filename: &str, now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{stamp}-{filename}")
}
