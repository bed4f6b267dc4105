// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-api
//!
//! HTTP query surface for the tagbridge gateway:
//!
//! - `GET /health` — upstream liveness with degraded reporting
//! - `GET /status` — 204 liveness probe
//! - `GET /values` — last values as JSON, bytes as base64
//! - `GET /influxdb-metrics` — last values as line protocol
//! - `POST /pubsub/subscribe` / `POST /pubsub/unsubscribe` — broker
//!   subscription webhooks
//!
//! Both value endpoints read exactly one store snapshot per request.

pub mod handlers;
pub mod lineprotocol;
pub mod server;
pub mod state;

pub use server::{ApiConfig, ApiServer};
pub use state::{AppState, AppStateBuilder, SubscriptionControl};
