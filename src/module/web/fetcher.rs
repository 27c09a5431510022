///! Page fetching abstraction for the web poller.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Per-request timeout; a hung site must not block a poll cycle.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Some cluster pages refuse obvious bots; present a browser identity.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one URL and return its body. Any transport or HTTP-status
    /// failure is an error; the poller logs it and moves on.
    async fn fetch(&self, url: &str) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to build reqwest client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to GET {url}"))?
            .error_for_status()
            .with_context(|| format!("HTTP error from {url}"))?;

        response
            .text()
            .await
            .with_context(|| format!("failed to read body from {url}"))
    }
}
