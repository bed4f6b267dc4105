// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-pubsub
//!
//! Pub/sub fan-out for the tagbridge gateway.
//!
//! - **Transport**: broker abstraction and publication payloads
//! - **Registry**: refcounted subscriptions keyed by tag set + interval
//! - **Publisher**: one timed publish loop per armed subscription
//! - **Heartbeat**: fixed-interval namespace liveness channel
//! - **Render**: declared-order field rendering with per-field isolation
//!
//! ```text
//! subscribe/unsubscribe ──► SubscriptionRegistry ──► PublisherTask (per key)
//!                                   │                      │ snapshot
//!                                   ▼                      ▼
//!                            MonitorControl          PubSubTransport
//! ```

pub mod heartbeat;
pub mod publisher;
pub mod registry;
pub mod render;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use heartbeat::{HeartbeatTask, HEALTHY_DESCRIPTION};
pub use publisher::{ChannelBindings, PublisherTask};
pub use registry::{Ack, MonitorControl, SubscriptionRegistry, TagSetRequest};
pub use render::{data_fields, render_value};
pub use transport::{PubSubTransport, Publication, PublishError};
