// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock implementations shared across the integration suites.
//!
//! The upstream side itself is simulated by
//! [`tagbridge_opcua::SimulatedUpstream`]; this module adds the broker side
//! and the glue the registry needs.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use tagbridge_core::error::UpstreamResult;
use tagbridge_core::TagKey;
use tagbridge_opcua::{SimulatedUpstream, UpstreamClient};
use tagbridge_pubsub::{MonitorControl, PubSubTransport, Publication, PublishError};

// =============================================================================
// RecordingBroker
// =============================================================================

/// A broker that records every publication for later inspection.
#[derive(Default)]
pub struct RecordingBroker {
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingBroker {
    /// Creates an empty recording broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// All publications in arrival order.
    pub fn publications(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().clone()
    }

    /// Number of publications on one channel.
    pub fn count_for(&self, channel: &str) -> usize {
        self.published
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .count()
    }

    /// The most recent publication on one channel.
    pub fn last_for(&self, channel: &str) -> Option<serde_json::Value> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|(c, _)| c == channel)
            .map(|(_, p)| p.clone())
    }

    /// Drops all recorded publications.
    pub fn clear(&self) {
        self.published.lock().clear();
    }
}

#[async_trait]
impl PubSubTransport for RecordingBroker {
    async fn publish(&self, channel: &str, payload: Publication) -> Result<(), PublishError> {
        self.published
            .lock()
            .push((channel.to_string(), payload.to_json()));
        Ok(())
    }
}

// =============================================================================
// ClientMonitors
// =============================================================================

/// Routes the registry's monitor calls through the upstream client.
pub struct ClientMonitors(pub Arc<UpstreamClient<SimulatedUpstream>>);

#[async_trait]
impl MonitorControl for ClientMonitors {
    async fn monitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.0.monitor(key).await
    }

    async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()> {
        self.0.unmonitor(key).await
    }
}
