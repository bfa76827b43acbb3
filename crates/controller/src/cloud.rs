//! HTTP client for the cloud telemetry channel.

use std::future::Future;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::{FetchError, TransportError};
use crate::feed::{self, Update};
use crate::schedule::Schedule;

/// Read and write access to the per-device cloud channel.
pub trait CloudFeed {
    /// Latest schedule entry on the channel.
    fn fetch_latest(&self) -> impl Future<Output = Result<Schedule, FetchError>> + Send;

    /// Post the schedule's public fields as a new channel entry.
    fn publish(&self, schedule: &Schedule) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// ThingSpeak-style channel: `GET .../feeds/last.json`, `POST /update.json`.
pub struct ChannelClient {
    client: reqwest::Client,
    base_url: String,
    channel_id: u64,
    api_key: String,
}

impl ChannelClient {
    pub fn new(client: reqwest::Client, base_url: &str, channel_id: u64, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            channel_id,
            api_key,
        }
    }

    fn latest_url(&self) -> String {
        format!(
            "{}/channels/{}/feeds/last.json?api_key={}",
            self.base_url, self.channel_id, self.api_key
        )
    }

    fn update_url(&self) -> String {
        format!("{}/update.json", self.base_url)
    }
}

impl CloudFeed for ChannelClient {
    async fn fetch_latest(&self) -> Result<Schedule, FetchError> {
        let resp = self
            .client
            .get(self.latest_url())
            .send()
            .await
            .map_err(TransportError::from)?;
        if resp.status() != StatusCode::OK {
            return Err(TransportError::Status(resp.status().as_u16()).into());
        }
        let body = resp.bytes().await.map_err(TransportError::from)?;
        debug!(len = body.len(), "fetched latest channel entry");
        feed::parse_latest(&body)
    }

    async fn publish(&self, schedule: &Schedule) -> Result<(), TransportError> {
        let resp = self
            .client
            .post(self.update_url())
            .json(&Update::new(schedule, &self.api_key))
            .send()
            .await?;
        if resp.status() != StatusCode::OK {
            return Err(TransportError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}
