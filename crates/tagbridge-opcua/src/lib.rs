// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-opcua
//!
//! Upstream client layer for the tagbridge gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     UpstreamClient<T>                           │
//! │      (reconnect supervision, monitor bookkeeping, pump)         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   UpstreamTransport (trait)                     │
//! │            (session, browse, monitor, notifications)            │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SimulatedUpstream                          │
//! │           (in-process address space for dev and tests)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`resolver`] module turns configuration entries (tags and
//! containers) into a flat tag set by browsing through the client.

pub mod client;
pub mod resolver;
pub mod security;
pub mod sim;
pub mod transport;

pub use client::{ClientConfig, UpstreamClient};
pub use resolver::{resolve_tags, ChildBrowser, ResolveLimits, ResolveOutcome, TagEntry};
pub use security::{SecurityConfig, SecurityMode, SecurityParams, SecurityPolicy, UserIdentity};
pub use sim::SimulatedUpstream;
pub use transport::{BrowsedNode, Notification, UpstreamTransport};
