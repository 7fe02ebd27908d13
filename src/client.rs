//! Open511 API client.
//!
//! Provides async HTTP access to Open511 event feeds.
//! Uses reqwest with rustls for TLS.

use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::config::FeedConfig;
use crate::errors::RoadtailError;
use crate::models::EventFeed;

/// Default request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent string for API requests.
const USER_AGENT: &str = concat!("roadtail/", env!("CARGO_PKG_VERSION"));

/// Anything that can produce one fresh event feed per call.
pub trait FeedSource: Send + Sync + 'static {
    /// Fetch the current feed.
    fn fetch(&self) -> impl Future<Output = Result<EventFeed, RoadtailError>> + Send;
}

/// Client for an Open511 events endpoint.
#[derive(Debug, Clone)]
pub struct Open511Client {
    client: Client,
    url: Url,
}

impl Open511Client {
    /// Create a client for the endpoint described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &FeedConfig) -> Result<Self, RoadtailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            url: config.events_url()?,
        })
    }

    /// Request URL, query string included.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch the events feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// non-success status, or the body is not an Open511 events document.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_events(&self) -> Result<EventFeed, RoadtailError> {
        debug!("fetching events");

        let response = self.client.get(self.url.clone()).send().await?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RoadtailError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let value: serde_json::Value = serde_json::from_str(&body)?;

        // Validate response structure
        if value.get("events").is_none() {
            return Err(RoadtailError::InvalidResponse(
                "missing `events` field".to_string(),
            ));
        }

        let feed: EventFeed = serde_json::from_value(value)?;

        debug!(
            "fetched {} events (api {})",
            feed.events.len(),
            feed.meta
                .as_ref()
                .and_then(|m| m.version.as_deref())
                .unwrap_or("?")
        );
        Ok(feed)
    }
}

impl FeedSource for Open511Client {
    fn fetch(&self) -> impl Future<Output = Result<EventFeed, RoadtailError>> + Send {
        self.fetch_events()
    }
}
