// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Upstream transport abstraction layer.
//!
//! The bridge talks to the upstream address space exclusively through the
//! [`UpstreamTransport`] trait. Protocol details (session handshakes,
//! secure channels, encodings) live behind this boundary, which keeps the
//! client logic testable against in-process implementations.

use async_trait::async_trait;
use tokio::sync::mpsc;

use tagbridge_core::error::UpstreamResult;
use tagbridge_core::types::{ConnectionState, Sample, TagKey};

// =============================================================================
// Notifications
// =============================================================================

/// A data-change notification emitted by a monitored tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Tag the change belongs to.
    pub key: TagKey,

    /// The new sample.
    pub sample: Sample,
}

impl Notification {
    /// Creates a notification.
    pub fn new(key: TagKey, sample: Sample) -> Self {
        Self { key, sample }
    }
}

// =============================================================================
// Browse results
// =============================================================================

/// A child node discovered while browsing a container.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowsedNode {
    /// Display name of the node.
    pub name: String,

    /// Upstream identity of the node.
    pub key: TagKey,

    /// `true` when the node has children of its own.
    pub is_container: bool,
}

// =============================================================================
// UpstreamTransport
// =============================================================================

/// Abstract upstream session.
///
/// Implementations own the protocol session and the notification stream.
/// The stream is created once per transport and spans reconnects: the
/// receiver returned by [`take_notifications`](Self::take_notifications)
/// stays valid while the client re-establishes the session, and only
/// closes when the transport is dropped or disconnected for good.
///
/// Monitored-item registrations do NOT survive a session loss; the client
/// re-registers its monitored set after every reconnect.
#[async_trait]
pub trait UpstreamTransport: Send + Sync + 'static {
    /// Establishes the upstream session.
    async fn connect(&self) -> UpstreamResult<()>;

    /// Tears the session down.
    async fn disconnect(&self) -> UpstreamResult<()>;

    /// Current session state.
    fn state(&self) -> ConnectionState;

    /// Resolves until an established session drops.
    ///
    /// Used by the client's supervision loop to learn about disruptions
    /// without polling. Must not resolve while the session is healthy.
    async fn wait_for_disruption(&self);

    /// Returns `true` when the upstream exports the given namespace URI.
    async fn namespace_known(&self, uri: &str) -> UpstreamResult<bool>;

    /// Lists the children of a container node.
    async fn browse_children(&self, key: &TagKey) -> UpstreamResult<Vec<BrowsedNode>>;

    /// Registers a monitored item for the tag.
    async fn monitor(&self, key: &TagKey) -> UpstreamResult<()>;

    /// Removes the monitored item for the tag.
    async fn unmonitor(&self, key: &TagKey) -> UpstreamResult<()>;

    /// Takes the notification receiver.
    ///
    /// May be called once per transport; a second call returns
    /// [`UpstreamError::StreamTaken`](tagbridge_core::error::UpstreamError::StreamTaken).
    fn take_notifications(&self) -> UpstreamResult<mpsc::Receiver<Notification>>;
}
