// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use tagbridge_config::ConfigLoader;

use crate::cli::{Cli, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Loads and validates configuration without starting the bridge.
pub async fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config = ConfigLoader::load(&cli.config).await?;
    config.validate()?;

    let server = config.active_server()?;
    println!("Configuration OK: {}", cli.config);
    println!(
        "  server: {} ({}), {} tag entries",
        server.id,
        server.server_url,
        server.tags.len()
    );
    println!(
        "  pubsub namespace: {}, heartbeat every {}ms",
        config.pubsub.namespace, config.pubsub.heartbeat_interval_ms
    );
    println!("  query server: {}:{}", config.api.host, config.api.port);

    if args.show_config {
        let rendered = serde_yaml::to_string(&config)
            .map_err(|e| BinError::runtime(format!("failed to render config: {}", e)))?;
        println!("\n{}", rendered);
    }

    Ok(())
}
