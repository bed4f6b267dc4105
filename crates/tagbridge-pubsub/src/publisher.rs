// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-subscription publisher task.
//!
//! Each armed subscription owns one task with its own timer. Every tick
//! takes one snapshot of the store restricted to the subscription's tags
//! and publishes the rendered fields to every channel bound to the
//! subscription, whether or not anything changed since the last tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use tagbridge_core::store::ValueStore;
use tagbridge_core::types::TagSet;

use crate::render::data_fields;
use crate::transport::{PubSubTransport, Publication};

/// Channels bound to one subscription, with per-channel subscribe counts.
///
/// Shared between the registry (which adds and removes bindings) and the
/// running task (which publishes to every bound channel).
pub type ChannelBindings = Arc<RwLock<HashMap<String, usize>>>;

/// One subscription's publish loop.
pub struct PublisherTask<P: PubSubTransport> {
    transport: Arc<P>,
    store: ValueStore,
    tag_set: TagSet,
    interval: Duration,
    channels: ChannelBindings,
    shutdown: watch::Receiver<bool>,
}

impl<P: PubSubTransport> PublisherTask<P> {
    /// Creates a task; it does nothing until [`run`](Self::run) is awaited.
    pub fn new(
        transport: Arc<P>,
        store: ValueStore,
        tag_set: TagSet,
        interval: Duration,
        channels: ChannelBindings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            store,
            tag_set,
            interval,
            channels,
            shutdown,
        }
    }

    /// Runs the publish loop until shutdown.
    ///
    /// Cancellation takes effect at the next tick boundary; a tick already
    /// publishing completes normally.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.publish_tick().await,
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(interval_ms = self.interval.as_millis() as u64, "Publisher task stopped");
    }

    async fn publish_tick(&self) {
        let keys: Vec<_> = self.tag_set.keys().cloned().collect();
        let snapshot = self.store.snapshot(Some(&keys));
        let fields = data_fields(&self.tag_set, &snapshot);

        let channels: Vec<String> = self.channels.read().keys().cloned().collect();
        for channel in channels {
            let payload = Publication::Data {
                fields: fields.clone(),
            };
            if let Err(e) = self.transport.publish(&channel, payload).await {
                warn!(channel = %channel, error = %e, "Publish failed");
            }
        }
    }
}
