//! HTTP page fetcher backed by reqwest.

use anyhow::anyhow;
use apigen_core::HttpFetcher;
use apigen_core::config::CrawlConfig;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::{debug, warn};

const MAX_REDIRECTS: usize = 10;

/// Follow redirects only while they stay on the host of the first request.
/// A redirect elsewhere is not followed, so its 3xx response fails the fetch.
fn same_host_redirects() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let same_host = attempt
            .previous()
            .first()
            .is_none_or(|first| first.host_str() == attempt.url().host_str());
        if same_host {
            attempt.follow()
        } else {
            warn!(from = %attempt.previous()[0], to = %attempt.url(), "Refusing cross-host redirect");
            attempt.stop()
        }
    })
}

/// Fetches pages with a shared client. Non-2xx responses are errors.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(config: &CrawlConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.fetch_timeout())
            .redirect(same_host_redirects())
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch URL: {}", e))?;

        if response.status().is_redirection() {
            return Err(anyhow!(
                "redirect to another host refused ({}): {}",
                response.status(),
                url
            ));
        }
        if !response.status().is_success() {
            return Err(anyhow!("HTTP error {}: {}", response.status(), url));
        }

        response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))
    }
}
