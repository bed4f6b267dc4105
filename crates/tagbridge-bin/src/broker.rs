// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Broker transports used by the binary.
//!
//! Two implementations of [`PubSubTransport`] are provided:
//!
//! - [`HttpBroker`] publishes over the broker's HTTP API
//! - [`LogBroker`] logs publications, used when no broker is configured

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use tagbridge_pubsub::{PubSubTransport, Publication, PublishError};

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// HttpBroker
// =============================================================================

/// Publishes to a broker's HTTP publish API.
///
/// Requests carry an `apikey` authorization header and a
/// `{"method": "publish", "params": {"channel", "data"}}` body.
pub struct HttpBroker {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpBroker {
    /// Creates a broker client for the given publish endpoint.
    pub fn new(url: impl Into<String>, api_key: Option<String>) -> Result<Self, PublishError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .map_err(|e| PublishError::new(&url, e.to_string()))?;
        Ok(Self { client, url, api_key })
    }
}

#[async_trait]
impl PubSubTransport for HttpBroker {
    async fn publish(&self, channel: &str, payload: Publication) -> Result<(), PublishError> {
        let body = json!({
            "method": "publish",
            "params": {
                "channel": channel,
                "data": payload.to_json(),
            },
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("apikey {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| PublishError::new(channel, e.to_string()))?;

        if !response.status().is_success() {
            return Err(PublishError::new(
                channel,
                format!("broker returned {}", response.status()),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// LogBroker
// =============================================================================

/// Logs publications instead of delivering them.
#[derive(Debug, Default)]
pub struct LogBroker;

#[async_trait]
impl PubSubTransport for LogBroker {
    async fn publish(&self, channel: &str, payload: Publication) -> Result<(), PublishError> {
        debug!(channel = %channel, payload = %payload.to_json(), "Publication (no broker configured)");
        Ok(())
    }
}

// =============================================================================
// BridgeBroker
// =============================================================================

/// The broker selected by configuration.
pub enum BridgeBroker {
    /// HTTP publish API.
    Http(HttpBroker),
    /// Log-only fallback.
    Log(LogBroker),
}

impl BridgeBroker {
    /// Builds a broker from optional endpoint settings.
    pub fn from_settings(
        url: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Self, PublishError> {
        match url {
            Some(url) => Ok(Self::Http(HttpBroker::new(
                url,
                api_key.map(str::to_string),
            )?)),
            None => Ok(Self::Log(LogBroker)),
        }
    }
}

#[async_trait]
impl PubSubTransport for BridgeBroker {
    async fn publish(&self, channel: &str, payload: Publication) -> Result<(), PublishError> {
        match self {
            Self::Http(b) => b.publish(channel, payload).await,
            Self::Log(b) => b.publish(channel, payload).await,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_broker_accepts_everything() {
        let broker = LogBroker;
        let payload = Publication::Heartbeat {
            status: 0,
            description: "Everything OK".to_string(),
        };
        broker.publish("ns:heartbeat", payload).await.unwrap();
    }

    #[tokio::test]
    async fn http_broker_reports_unreachable_endpoint() {
        let broker = HttpBroker::new("http://127.0.0.1:1/api", None).unwrap();
        let payload = Publication::Heartbeat {
            status: 0,
            description: "Everything OK".to_string(),
        };
        let err = broker.publish("ns:heartbeat", payload).await.unwrap_err();
        assert_eq!(err.channel, "ns:heartbeat");
    }
}
