//! HTTP client for the campaign API
//!
//! Every call is a single GET with no retries; the stream controller owns
//! reconnection. Bodies may come wrapped (`{"campaigns": [...]}`) or bare
//! (`[...]`); both are accepted.

use std::collections::VecDeque;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::stream::{MessageStream, SseDecoder, StreamTransport};
use crate::types::{json_kind, Campaign, CampaignId, GlobalInsights, RawMetricsPayload};

/// HTTP client for the campaign API
#[derive(Debug, Clone)]
pub struct CampaignClient {
    http_client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl CampaignClient {
    /// Create a client from configuration.
    ///
    /// The request timeout applies to every call except the event stream,
    /// which only has a connect timeout.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .connect_timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url(),
            timeout: config.timeout(),
        })
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// `GET /campaigns`
    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>> {
        let body = self.get_required("/campaigns").await?;
        decode(unwrap_key(body, "campaigns"))
    }

    /// `GET /campaigns/{id}`
    ///
    /// Returns [`Error::NotFound`] for a 404 or a `null` campaign.
    pub async fn fetch_campaign(&self, id: &CampaignId) -> Result<Campaign> {
        let path = format!("/campaigns/{}", id.url_segment());
        let body = self
            .get_json(&path)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        match unwrap_key(body, "campaign") {
            Value::Null => Err(Error::NotFound(id.to_string())),
            campaign => decode_object(campaign),
        }
    }

    /// `GET /campaigns/insights`
    pub async fn fetch_global_insights(&self) -> Result<GlobalInsights> {
        let body = self.get_required("/campaigns/insights").await?;
        decode_object(unwrap_key(body, "insights"))
    }

    /// `GET /campaigns/{id}/insights`
    pub async fn fetch_insight_snapshot(&self, id: &CampaignId) -> Result<RawMetricsPayload> {
        let path = format!("/campaigns/{}/insights", id.url_segment());
        let body = self.get_required(&path).await?;
        RawMetricsPayload::from_value(unwrap_key(body, "insights"))
    }

    /// `GET /campaigns/{id}/insights/stream`
    ///
    /// Resolves once the response headers arrive. The returned stream yields
    /// the `data` of each event and ends when the server closes the body; a
    /// body read failure is yielded as [`Error::Network`] and ends it too.
    pub async fn open_insight_stream(&self, id: &CampaignId) -> Result<MessageStream> {
        let url = format!(
            "{}/campaigns/{}/insights/stream",
            self.base_url,
            id.url_segment()
        );
        tracing::debug!(url = %url, "Opening insight stream");

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| Error::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("API error ({})", status)));
        }

        let state = (
            Box::pin(response.bytes_stream()),
            SseDecoder::new(),
            VecDeque::new(),
            false,
        );
        let messages = futures::stream::unfold(
            state,
            |(mut body, mut decoder, mut pending, failed)| async move {
                loop {
                    if let Some(data) = pending.pop_front() {
                        return Some((Ok(data), (body, decoder, pending, failed)));
                    }
                    if failed {
                        return None;
                    }
                    match body.next().await {
                        Some(Ok(chunk)) => pending.extend(decoder.feed(&chunk)),
                        Some(Err(e)) => {
                            let err = Error::Network(format!("stream read failed: {}", e));
                            return Some((Err(err), (body, decoder, pending, true)));
                        }
                        None => {
                            if decoder.has_pending() {
                                tracing::debug!("Discarding incomplete event at end of stream");
                            }
                            return None;
                        }
                    }
                }
            },
        );

        Ok(messages.boxed())
    }

    /// GET `path` and parse the body as JSON. `Ok(None)` for a 404.
    async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Network(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::warn!(url = %url, status = %status, "Campaign API error");
            return Err(Error::Network(format!(
                "API error ({}): {}",
                status,
                truncate(&body, 200)
            )));
        }

        serde_json::from_str(&body)
            .map(Some)
            .map_err(|e| Error::Parse(format!("invalid JSON from {}: {}", path, e)))
    }

    /// Like [`Self::get_json`], but a 404 is a plain API error.
    async fn get_required(&self, path: &str) -> Result<Value> {
        self.get_json(path).await?.ok_or_else(|| {
            Error::Network(format!("API error ({}): {}", StatusCode::NOT_FOUND, path))
        })
    }
}

impl StreamTransport for CampaignClient {
    fn connect(
        &self,
        campaign_id: &CampaignId,
    ) -> futures::future::BoxFuture<'static, Result<MessageStream>> {
        let client = self.clone();
        let campaign_id = campaign_id.clone();
        Box::pin(async move { client.open_insight_stream(&campaign_id).await })
    }
}

/// Take `body[key]` when the body is an object wrapping it, else the body.
fn unwrap_key(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => {
            map.remove(key).unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    Ok(serde_json::from_value(value)?)
}

/// Like [`decode`], for records: arrays must not fill struct fields by position.
fn decode_object<T: DeserializeOwned>(value: Value) -> Result<T> {
    match value {
        Value::Object(_) => decode(value),
        other => Err(Error::Parse(format!(
            "expected an object, got {}",
            json_kind(&other)
        ))),
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
