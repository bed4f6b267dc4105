// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge-bin
//!
//! CLI binary for the tagbridge gateway.
//!
//! This crate provides the main binary entry point, including:
//!
//! - CLI argument parsing with clap
//! - Bridge runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//! - Command implementations (run, validate, health, version)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  main.rs                     │
//! └───────────────────────┬─────────────────────┘
//!                         │
//!                  ┌──────▼──────┐
//!                  │    cli.rs   │
//!                  └──────┬──────┘
//!                         │
//!             ┌───────────┼───────────┐
//!             ▼           ▼           ▼
//!      ┌──────────┐ ┌──────────┐ ┌──────────┐
//!      │ commands │ │ runtime  │ │ logging  │
//!      └──────────┘ └────┬─────┘ └──────────┘
//!                        │
//!             ┌──────────┼──────────┐
//!             ▼          ▼          ▼
//!      ┌──────────┐ ┌─────────┐ ┌──────────┐
//!      │  broker  │ │shutdown │ │tagbridge-│
//!      │          │ │         │ │  crates  │
//!      └──────────┘ └─────────┘ └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the bridge (default command)
//! tagbridge
//!
//! # Start with a config fetched over HTTP
//! tagbridge -c http://config-api.local/servers
//!
//! # Validate configuration
//! tagbridge validate
//!
//! # Check a running bridge
//! tagbridge health --url http://127.0.0.1:4870
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod broker;
pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{BridgeRuntime, RuntimeBuilder};
pub use shutdown::ShutdownCoordinator;
