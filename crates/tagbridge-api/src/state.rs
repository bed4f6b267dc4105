// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared application state for the query server.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use tagbridge_core::error::{ApiError, ApiResult, BridgeResult};
use tagbridge_core::store::ValueStore;
use tagbridge_core::types::{ConnectionState, TagSet};
use tagbridge_pubsub::registry::{Ack, MonitorControl, SubscriptionRegistry, TagSetRequest};
use tagbridge_pubsub::transport::PubSubTransport;

// =============================================================================
// SubscriptionControl
// =============================================================================

/// Object-safe view of the subscription registry for the webhook handlers.
#[async_trait]
pub trait SubscriptionControl: Send + Sync {
    /// Handles a subscribe request.
    async fn subscribe(&self, channel: &str, request: Option<&TagSetRequest>)
        -> BridgeResult<Ack>;

    /// Handles an unsubscribe request.
    async fn unsubscribe(&self, channel: &str) -> BridgeResult<Ack>;
}

#[async_trait]
impl<P: PubSubTransport, M: MonitorControl> SubscriptionControl for SubscriptionRegistry<P, M> {
    async fn subscribe(
        &self,
        channel: &str,
        request: Option<&TagSetRequest>,
    ) -> BridgeResult<Ack> {
        SubscriptionRegistry::subscribe(self, channel, request).await
    }

    async fn unsubscribe(&self, channel: &str) -> BridgeResult<Ack> {
        SubscriptionRegistry::unsubscribe(self, channel).await
    }
}

// =============================================================================
// AppState
// =============================================================================

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    /// Last-value store, written by the upstream pump.
    pub store: ValueStore,

    /// Tags resolved from configuration, in declared order.
    pub tag_set: Arc<TagSet>,

    /// Upstream connection state.
    pub upstream: watch::Receiver<ConnectionState>,

    /// Set once the upstream reconnect backoff has saturated.
    pub degraded: Arc<AtomicBool>,

    /// Subscription registry handle for the webhook endpoints.
    pub subscriptions: Arc<dyn SubscriptionControl>,
}

impl AppState {
    /// Starts building an [`AppState`].
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::default()
    }
}

/// Builder for [`AppState`].
#[derive(Default)]
pub struct AppStateBuilder {
    store: Option<ValueStore>,
    tag_set: Option<Arc<TagSet>>,
    upstream: Option<watch::Receiver<ConnectionState>>,
    degraded: Option<Arc<AtomicBool>>,
    subscriptions: Option<Arc<dyn SubscriptionControl>>,
}

impl AppStateBuilder {
    /// Sets the value store.
    pub fn store(mut self, store: ValueStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Sets the resolved tag set.
    pub fn tag_set(mut self, tag_set: Arc<TagSet>) -> Self {
        self.tag_set = Some(tag_set);
        self
    }

    /// Sets the upstream state watch.
    pub fn upstream(mut self, upstream: watch::Receiver<ConnectionState>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Sets the degraded flag.
    pub fn degraded(mut self, degraded: Arc<AtomicBool>) -> Self {
        self.degraded = Some(degraded);
        self
    }

    /// Sets the subscription registry handle.
    pub fn subscriptions(mut self, subscriptions: Arc<dyn SubscriptionControl>) -> Self {
        self.subscriptions = Some(subscriptions);
        self
    }

    /// Builds the state, failing on any missing component.
    pub fn build(self) -> ApiResult<AppState> {
        Ok(AppState {
            store: self
                .store
                .ok_or_else(|| ApiError::internal("missing value store"))?,
            tag_set: self
                .tag_set
                .ok_or_else(|| ApiError::internal("missing tag set"))?,
            upstream: self
                .upstream
                .ok_or_else(|| ApiError::internal("missing upstream state"))?,
            degraded: self
                .degraded
                .ok_or_else(|| ApiError::internal("missing degraded flag"))?,
            subscriptions: self
                .subscriptions
                .ok_or_else(|| ApiError::internal("missing subscription registry"))?,
        })
    }
}
