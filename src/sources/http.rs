//! HTTP playlist fetcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};

use super::traits::PlaylistFetcher;
use crate::config::NetworkConfig;
use crate::errors::{AppResult, SourceError, SourceResult};
use crate::utils::{RetryPolicy, UrlUtils, with_retry};

/// Fetches playlists over HTTP(S) with a per-attempt timeout and bounded retry
///
/// Attempts for one source run strictly one after another; concurrency
/// across sources is the caller's concern.
pub struct HttpPlaylistFetcher {
    client: Client,
    timeout: Duration,
    policy: RetryPolicy,
}

impl HttpPlaylistFetcher {
    pub fn new(client: Client, timeout: Duration, policy: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            policy,
        }
    }

    pub fn from_config(config: &NetworkConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.timeout)
            .gzip(true)
            .build()?;

        Ok(Self::new(client, config.timeout, config.retry_policy()))
    }

    async fn fetch_once(&self, url: &str, attempt: u32) -> SourceResult<String> {
        debug!(url = %UrlUtils::obfuscate_credentials(url), attempt, "Fetching source");

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, &e))?;

        // Sources in the wild are not always valid UTF-8; bad bytes only hurt their own lines
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[async_trait]
impl PlaylistFetcher for HttpPlaylistFetcher {
    async fn fetch(&self, url: &str) -> SourceResult<String> {
        let display_url = UrlUtils::obfuscate_credentials(url);
        let content = with_retry(&self.policy, &display_url, |attempt| {
            self.fetch_once(url, attempt)
        })
        .await?;

        info!(url = %display_url, bytes = content.len(), "Fetched source");
        Ok(content)
    }
}

/// Map a transport error onto the source error taxonomy
fn classify_error(url: &str, error: &reqwest::Error) -> SourceError {
    if error.is_timeout() {
        SourceError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        SourceError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        SourceError::Network {
            url: url.to_string(),
            message: UrlUtils::obfuscate_credentials(&error.to_string()),
        }
    }
}
