// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! This module provides the command-line interface for tagbridge using clap.
//! It supports multiple subcommands for different operations:
//!
//! - `run`: Start the bridge (default)
//! - `validate`: Validate configuration
//! - `health`: Query a running bridge's health endpoint
//! - `version`: Show version information

use clap::{Args, Parser, Subcommand, ValueEnum};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// tagbridge - OPC UA to pub/sub bridge
///
/// Monitors tags on an upstream server and fans their values out to
/// pub/sub channels, with a query server for on-demand reads.
#[derive(Parser, Debug)]
#[command(
    name = "tagbridge",
    author = "Sylvex <contact@sylvex.io>",
    version = tagbridge_core::VERSION,
    about = "OPC UA to pub/sub bridge",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration source: a file path or an http(s) URL
    #[arg(
        short,
        long,
        default_value = "tagbridge.yaml",
        env = "TAGBRIDGE_CONFIG",
        global = true
    )]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "info",
        env = "TAGBRIDGE_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "TAGBRIDGE_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Returns the command to execute, defaulting to `run`.
    pub fn effective_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run(RunArgs::default()))
    }
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the tagbridge CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the bridge
    ///
    /// This is the default command when no subcommand is specified.
    /// It connects upstream, resolves configured tags and serves queries.
    Run(RunArgs),

    /// Validate the configuration
    ///
    /// Loads and validates the configuration without starting the bridge.
    Validate(ValidateArgs),

    /// Query a running bridge's health endpoint
    Health(HealthArgs),

    /// Show version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Override the configured server entry by id
    #[arg(long, env = "TAGBRIDGE_SERVER_ID")]
    pub server_id: Option<String>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Show the parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,
}

/// Arguments for the `health` command.
#[derive(Args, Debug, Clone)]
pub struct HealthArgs {
    /// Base URL of the running bridge
    #[arg(short, long, default_value = "http://127.0.0.1:4870")]
    pub url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,
}

// =============================================================================
// Value Enums
// =============================================================================

/// Log output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output.
    Text,
    /// Structured JSON output.
    Json,
    /// Compact single-line output.
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format: {}", other)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_run() {
        let cli = Cli::parse_from(["tagbridge"]);
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
        assert_eq!(cli.config, "tagbridge.yaml");
    }

    #[test]
    fn parses_validate() {
        let cli = Cli::parse_from(["tagbridge", "validate", "--show-config"]);
        match cli.effective_command() {
            Commands::Validate(args) => assert!(args.show_config),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().ok(), Some(LogFormat::Json));
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
