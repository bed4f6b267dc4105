// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared test utilities.

pub mod fixtures;
pub mod mocks;

pub use fixtures::BridgeHarness;
pub use mocks::{ClientMonitors, RecordingBroker};
