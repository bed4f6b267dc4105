// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Test doubles shared by this crate's unit tests.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::transport::{PubSubTransport, Publication, PublishError};

/// Broker double that records everything it is asked to publish.
pub(crate) struct RecordingBroker {
    pub published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingBroker {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            published: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn count_for(&self, channel: &str) -> usize {
        self.published
            .lock()
            .iter()
            .filter(|(c, _)| c == channel)
            .count()
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
