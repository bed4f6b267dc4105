// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-core
//!
//! Core abstractions and shared types for the tagbridge gateway.
//!
//! This crate provides the foundation used across all tagbridge components:
//!
//! - **Types**: Tag identity (`TagKey`, `NodeIdentifier`), values and samples
//! - **Error**: Unified error hierarchy
//! - **Store**: Concurrent last-value store with consistent snapshots
//! - **Channel**: Pub/sub channel spec parsing
//! - **Retry**: Bounded exponential reconnect backoff
//!
//! ## Example
//!
//! ```rust,ignore
//! use tagbridge_core::types::{TagKey, Value, Sample};
//! use tagbridge_core::store::ValueStore;
//!
//! let store = ValueStore::new();
//! store.update(
//!     TagKey::new("urn:plant", "the.answer"),
//!     Sample::good(Value::Int(42), chrono::Utc::now()),
//! );
//! ```

pub mod channel;
pub mod error;
pub mod retry;
pub mod store;
pub mod types;

pub use channel::{ChannelSpec, DataChannel};
pub use error::{BridgeError, BridgeResult};
pub use store::{Snapshot, ValueStore};
pub use types::{
    ConnectionState, NodeIdentifier, Quality, ResolvedTag, Sample, TagKey, TagSet, Value,
};

/// Crate version, shared by all bridge components.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
