// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-config
//!
//! Configuration schema and loaders for the tagbridge gateway.
//!
//! Server entries follow the central configuration service's wire shape;
//! the remaining sections are bridge-local and fully defaulted.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use tagbridge_core::error::ConfigError;
pub use schema::{
    ApiSection, BridgeConfig, LoggingSection, PubSubSection, ResolveSection, ServerEntry,
    TagConfigEntry, UpstreamSection,
};
