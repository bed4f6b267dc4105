// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Namespace heartbeat task.
//!
//! The heartbeat runs at a fixed configured interval, independent of any
//! subscription or of the value store. While the upstream session is
//! healthy it publishes `{"status": 0, "description": "Everything OK"}`;
//! otherwise a non-zero status with the session state as the reason.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use tagbridge_core::channel::heartbeat_channel;
use tagbridge_core::types::ConnectionState;

use crate::transport::{PubSubTransport, Publication};

/// Description published while the upstream session is healthy.
pub const HEALTHY_DESCRIPTION: &str = "Everything OK";

/// The heartbeat publish loop.
pub struct HeartbeatTask<P: PubSubTransport> {
    transport: Arc<P>,
    channel: String,
    interval: Duration,
    upstream: watch::Receiver<ConnectionState>,
    shutdown: watch::Receiver<bool>,
}

impl<P: PubSubTransport> HeartbeatTask<P> {
    /// Creates a heartbeat task for the given namespace.
    pub fn new(
        transport: Arc<P>,
        namespace: &str,
        interval: Duration,
        upstream: watch::Receiver<ConnectionState>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            channel: heartbeat_channel(namespace),
            interval,
            upstream,
            shutdown,
        }
    }

    /// Builds the payload for the current upstream state.
    pub fn payload(state: ConnectionState) -> Publication {
        if state.is_connected() {
            Publication::Heartbeat {
                status: 0,
                description: HEALTHY_DESCRIPTION.to_string(),
            }
        } else {
            Publication::Heartbeat {
                status: 1,
                description: format!("upstream {}", state),
            }
        }
    }

    /// Runs the heartbeat loop until shutdown.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let state = *self.upstream.borrow();
                    let payload = Self::payload(state);
                    if let Err(e) = self.transport.publish(&self.channel, payload).await {
                        warn!(channel = %self.channel, error = %e, "Heartbeat publish failed");
                    }
                }
                result = self.shutdown.changed() => {
                    if result.is_err() || *self.shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!(channel = %self.channel, "Heartbeat task stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingBroker;

    #[test]
    fn healthy_payload() {
        let p = HeartbeatTask::<RecordingBroker>::payload(ConnectionState::Connected);
        assert_eq!(
            p.to_json(),
            serde_json::json!({"status": 0, "description": "Everything OK"})
        );
    }

    #[test]
    fn unhealthy_payload_carries_the_state() {
        let p = HeartbeatTask::<RecordingBroker>::payload(ConnectionState::Reconnecting);
        assert_eq!(
            p.to_json(),
            serde_json::json!({"status": 1, "description": "upstream reconnecting"})
        );
    }

    #[tokio::test]
    async fn publishes_more_than_once_per_two_intervals() {
        let broker = RecordingBroker::new();
        let (_state_tx, state_rx) = watch::channel(ConnectionState::Connected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = HeartbeatTask::new(
            broker.clone(),
            "plant1",
            Duration::from_millis(25),
            state_rx,
            shutdown_rx,
        );
        let handle = tokio::spawn(task.run());

        // Two intervals plus slack.
        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        let published = broker.published.lock();
        assert!(published.len() > 1, "got {} heartbeats", published.len());
        for (channel, payload) in published.iter() {
            assert_eq!(channel, "plant1:heartbeat");
            assert_eq!(
                payload,
                &serde_json::json!({"status": 0, "description": "Everything OK"})
            );
        }
    }
}
