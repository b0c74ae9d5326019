//! ThingSpeak REST client
//!
//! Reads the `last.json` and `feeds.json` endpoints of a channel.

use super::{FeedError, FeedRecord, FeedSeries, MetricsSource};
use crate::config::FeedChannel;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Body of `GET /channels/{id}/feeds.json`
#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    feeds: Vec<FeedRecord>,
}

/// [`MetricsSource`] backed by the ThingSpeak HTTP API
#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: HttpClient,
    base_url: Url,
}

impl ThingSpeakClient {
    /// Create a client for the given API root.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Malformed` if `base_url` is not a valid URL, or
    /// `FeedError::Network` if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FeedError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FeedError::Malformed(format!("invalid base URL {base_url}: {e}")))?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FeedError::Network(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    /// URL of the latest-entry endpoint
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Malformed` if the base URL cannot hold a path.
    pub fn last_url(&self, channel: &FeedChannel) -> Result<Url, FeedError> {
        let mut url = self.channel_url(channel, &["feeds", "last.json"])?;
        if let Some(key) = &channel.read_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }
        Ok(url)
    }

    /// URL of the feed-history endpoint
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Malformed` if the base URL cannot hold a path.
    pub fn feed_url(&self, channel: &FeedChannel, results: u32) -> Result<Url, FeedError> {
        let mut url = self.channel_url(channel, &["feeds.json"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("results", &results.to_string());
            if let Some(key) = &channel.read_key {
                query.append_pair("api_key", key);
            }
        }
        Ok(url)
    }

    /// `{base}/channels/{id}/` followed by `leaf`
    fn channel_url(&self, channel: &FeedChannel, leaf: &[&str]) -> Result<Url, FeedError> {
        let mut url = self.base_url.clone();
        let channel_id = channel.channel_id.to_string();
        url.path_segments_mut()
            .map_err(|()| {
                FeedError::Malformed(format!("base URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["channels", channel_id.as_str()])
            .extend(leaf);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, FeedError> {
        let display_url = redact_url(&url);
        debug!(url = %display_url, "Fetching feed");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                status: status.as_u16(),
                url: display_url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Network(e.without_url().to_string()))?;
        serde_json::from_str(&body).map_err(|e| FeedError::Malformed(e.to_string()))
    }
}

/// Strip the read key from a URL before it reaches logs or errors
fn redact_url(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "api_key" {
                "[MASKED]".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();
    if pairs.is_empty() {
        redacted.set_query(None);
    } else {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}

#[async_trait]
impl MetricsSource for ThingSpeakClient {
    #[instrument(skip_all, fields(channel = channel.channel_id))]
    async fn latest(&self, channel: &FeedChannel) -> Result<FeedRecord, FeedError> {
        // Empty channels answer `-1`, which fails to parse as a record
        self.get_json(self.last_url(channel)?).await
    }

    #[instrument(skip_all, fields(channel = channel.channel_id))]
    async fn history(&self, channel: &FeedChannel, results: u32) -> Result<FeedSeries, FeedError> {
        let response: FeedResponse = self.get_json(self.feed_url(channel, results)?).await?;
        Ok(FeedSeries::new(response.feeds))
    }
}
