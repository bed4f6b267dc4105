// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! This module contains the implementation of all CLI commands:
//!
//! - `run`: Start the bridge
//! - `validate`: Validate configuration
//! - `health`: Query a running bridge's health endpoint
//! - `version`: Show version information

mod health;
mod run;
mod validate;
mod version;

pub use health::health_check;
pub use run::run;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args).await,
        Commands::Health(args) => health::health_check(args).await,
        Commands::Version => version::version(),
    }
}
