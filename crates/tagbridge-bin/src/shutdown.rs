// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! This module coordinates graceful shutdown across the bridge's background
//! tasks. It handles OS signals (SIGTERM, SIGINT on Unix, Ctrl+C elsewhere)
//! and flips a watch channel every component selects on.

use tokio::sync::watch;
use tracing::info;

// =============================================================================
// ShutdownCoordinator
// =============================================================================

/// Coordinates graceful shutdown across multiple components.
///
/// Components subscribe before being spawned and select on the returned
/// receiver. Once [`trigger`](Self::trigger) fires, the flag stays set.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: watch::Sender<bool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }

    /// Returns whether shutdown has been initiated.
    pub fn is_shutting_down(&self) -> bool {
        *self.sender.borrow()
    }

    /// Initiates shutdown.
    pub fn trigger(&self) {
        let _ = self.sender.send(true);
    }

    /// Waits for an OS termination signal, then initiates shutdown.
    pub async fn wait_for_signal(&self) {
        wait_for_termination().await;
        info!("Shutdown signal received");
        self.trigger();
    }

    /// A future that resolves once shutdown has been initiated.
    ///
    /// Suitable for `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn signal_future(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Signal Handling
// =============================================================================

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_wakes_subscribers() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutting_down());
        coordinator.trigger();

        rx.changed().await.unwrap();
        assert!(*rx.borrow());
        assert!(coordinator.is_shutting_down());
    }

    #[tokio::test]
    async fn signal_future_resolves_after_trigger() {
        let coordinator = ShutdownCoordinator::new();
        let fut = coordinator.signal_future();
        coordinator.trigger();
        fut.await;
    }

    #[tokio::test]
    async fn late_subscribers_see_the_flag() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.trigger();
        let rx = coordinator.subscribe();
        assert!(*rx.borrow());
    }
}
