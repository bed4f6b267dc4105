// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Pub/sub transport abstraction.
//!
//! The broker is a black box to the bridge: it accepts payloads for named
//! channels and delivers them at-least-once, ordered per channel. Delivery
//! guarantees and client fan-out are the broker's business, not ours.

use async_trait::async_trait;
use serde_json::Map;
use thiserror::Error;

// =============================================================================
// Publication
// =============================================================================

/// A payload handed to the broker.
#[derive(Debug, Clone, PartialEq)]
pub enum Publication {
    /// Periodic data payload: field name to rendered value, in the
    /// subscription's declared tag order.
    Data {
        /// Rendered fields.
        fields: Map<String, serde_json::Value>,
    },

    /// Namespace heartbeat.
    Heartbeat {
        /// 0 when the upstream session is healthy.
        status: u8,
        /// Human-readable state description.
        description: String,
    },
}

impl Publication {
    /// Renders the payload as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Publication::Data { fields } => serde_json::Value::Object(fields.clone()),
            Publication::Heartbeat {
                status,
                description,
            } => serde_json::json!({
                "status": status,
                "description": description,
            }),
        }
    }
}

// =============================================================================
// PublishError / PubSubTransport
// =============================================================================

/// Broker-side publish failure.
#[derive(Debug, Error)]
#[error("Publish to '{channel}' failed: {reason}")]
pub struct PublishError {
    /// Channel the publish was for.
    pub channel: String,
    /// Underlying reason.
    pub reason: String,
}

impl PublishError {
    /// Creates a publish error.
    pub fn new(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            reason: reason.into(),
        }
    }
}

/// Abstract broker connection.
#[async_trait]
pub trait PubSubTransport: Send + Sync + 'static {
    /// Publishes a payload to a channel.
    async fn publish(&self, channel: &str, payload: Publication) -> Result<(), PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_payload_shape() {
        let p = Publication::Heartbeat {
            status: 0,
            description: "Everything OK".into(),
        };
        assert_eq!(
            p.to_json(),
            serde_json::json!({"status": 0, "description": "Everything OK"})
        );
    }

    #[test]
    fn data_payload_preserves_field_order() {
        let mut fields = Map::new();
        fields.insert("2994".into(), serde_json::json!(false));
        fields.insert("2263".into(), serde_json::json!("open62541"));

        let rendered = serde_json::to_string(&Publication::Data { fields }.to_json()).unwrap();
        assert_eq!(rendered, r#"{"2994":false,"2263":"open62541"}"#);
    }
}
