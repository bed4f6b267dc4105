// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # tagbridge Integration Tests
//!
//! This crate provides integration tests for the tagbridge gateway,
//! exercising the bridge end to end: simulated upstream, value store,
//! subscription registry, publishers and the query server router.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `mocks`: Recording broker and monitoring adapters
//!   - `fixtures`: A wired-up bridge harness and tag helpers
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p tagbridge-tests
//!
//! # Run a specific suite
//! cargo test -p tagbridge-tests --test integration_pubsub
//! cargo test -p tagbridge-tests --test integration_api
//! ```

pub mod common;
