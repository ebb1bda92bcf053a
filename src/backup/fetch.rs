//! Configuration download.
//!
//! Only transport and HTTP status are judged here; whether the body really is
//! a configuration export is decided by [`validate`](super::validate).

use async_trait::async_trait;
use std::time::Duration;

use super::appliance_url;
use crate::config::BackupMethod;
use crate::error::FetchError;

/// Longest slice of an error body kept in a [`FetchError::Status`]
const ERROR_BODY_LIMIT: usize = 200;

/// Retrieves the configuration payload from one appliance address
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Request the backup from `address` using `api_key` as bearer token
    async fn fetch(&self, address: &str, api_key: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher calling the appliance REST API
pub struct HttpFetcher {
    client: reqwest::Client,
    scheme: String,
    path: String,
    method: BackupMethod,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher sharing `client`
    pub fn new(
        client: reqwest::Client,
        scheme: &str,
        path: &str,
        method: BackupMethod,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            scheme: scheme.to_string(),
            path: path.to_string(),
            method,
            timeout,
        }
    }

    async fn send(&self, url: url::Url, api_key: &str) -> Result<Vec<u8>, FetchError> {
        let display_url = url.to_string();
        let request = match self.method {
            BackupMethod::Get => self.client.get(url),
            BackupMethod::Post => self.client.post(url),
        };

        let response = request
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|e| transport(&display_url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                url: display_url,
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let payload = response
            .bytes()
            .await
            .map_err(|e| transport(&display_url, &e))?;
        tracing::debug!(url = %display_url, bytes = payload.len(), "backup data received");
        Ok(payload.to_vec())
    }
}

fn transport(url: &str, error: &reqwest::Error) -> FetchError {
    FetchError::Transport {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, address: &str, api_key: &str) -> Result<Vec<u8>, FetchError> {
        let url = appliance_url(&self.scheme, address, &self.path).map_err(|e| {
            FetchError::InvalidUrl {
                address: address.to_string(),
                reason: e.to_string(),
            }
        })?;
        let display_url = url.to_string();
        tracing::debug!(url = %display_url, method = ?self.method, "requesting backup");

        // Covers connect, headers and body; reqwest's own timeout is not set
        // on the shared client.
        match tokio::time::timeout(self.timeout, self.send(url, api_key)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                url: display_url,
                secs: self.timeout.as_secs(),
            }),
        }
    }
}
