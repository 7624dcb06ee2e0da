//! npm registry client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::config::UpdateConfig;
use crate::error::{UpdateError, UpdateResult};

/// User-Agent string for registry requests
pub const USER_AGENT: &str = concat!("pi-update/", env!("CARGO_PKG_VERSION"));

/// The only part of the `/latest` document we care about.
#[derive(Debug, Deserialize)]
struct LatestManifest {
    version: Option<String>,
}

/// Client for the package's `latest` dist-tag.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    url: String,
}

impl RegistryClient {
    /// Create a client for the package and registry named in `config`.
    pub fn new(config: &UpdateConfig) -> Self {
        Self::with_url(config.latest_url(), config.fetch_timeout)
    }

    /// Create a client for an explicit metadata URL.
    pub fn with_url(url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            url: url.into(),
        }
    }

    /// Get the metadata URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the latest published version.
    ///
    /// Any failure (timeout, network error, non-success status, missing
    /// `version` field) yields `None`. There is no retry.
    pub async fn fetch_latest(&self) -> Option<String> {
        match self.try_fetch_latest().await {
            Ok(version) => Some(version),
            Err(e) => {
                tracing::debug!("Failed to fetch latest version from {}: {}", self.url, e);
                None
            }
        }
    }

    /// Fetch the latest published version, reporting why it failed.
    pub async fn try_fetch_latest(&self) -> UpdateResult<String> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::ServerError {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let manifest: LatestManifest = response.json().await?;
        manifest.version.ok_or(UpdateError::MissingVersion)
    }
}
