//! Page fetching: a plain HTTP GET per URL, fanned out over a batch.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::FetchConfig;

/// Source of page text for a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// reqwest-backed fetcher
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .context("building reqwest client")?;
        Ok(Self { client })
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
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url}"))?;
        let body = response
            .text()
            .await
            .with_context(|| format!("decoding body of {url}"))?;
        Ok(body)
    }
}

/// A fetched page; `html` is empty when the fetch failed
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub html: String,
}

impl FetchedPage {
    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

/// Fetch one URL, logging a failure and returning empty content instead
pub async fn fetch_or_empty<F: PageFetcher + ?Sized>(fetcher: &F, url: &str) -> FetchedPage {
    let html = match fetcher.fetch(url).await {
        Ok(html) => {
            debug!("Fetched {} ({} bytes)", url, html.len());
            html
        }
        Err(e) => {
            error!("Failed to fetch {}: {:#}", url, e);
            String::new()
        }
    };
    FetchedPage {
        url: url.to_string(),
        html,
    }
}

/// Issue every fetch of the batch concurrently and wait for all of them.
///
/// Pages come back in input order. A failed fetch yields an empty page and
/// never aborts its siblings.
pub async fn fetch_all<F: PageFetcher + ?Sized>(fetcher: &F, urls: &[String]) -> Vec<FetchedPage> {
    join_all(urls.iter().map(|url| fetch_or_empty(fetcher, url))).await
}
