// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
mod cli;
mod features;

use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use cli::{Cli, Commands};
use features::{builtin_integrations, Integration};
use slotline_config::Config;
use slotline_features::{CapabilityRegistry, Feature};
use slotline_mcp::SlotlineMcpServer;
use slotline_tools::Catalog;

const DEFAULT_INSTRUCTIONS: &str = "Scheduling availability for Cal.com. \
    Call calcom_list_event_types first, let the user pick an event type, then call \
    calcom_get_event_type_slots with its id and an ISO-8601 window.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command_or_default() {
        Commands::Completions { shell } => {
            cli::print_completions(shell);
            Ok(())
        }
        Commands::ShowConfig => {
            let config = slotline_config::load(cli.config.as_deref())?;
            println!("{}", serde_yaml::to_string(&config.redacted())?);
            Ok(())
        }
        Commands::Features { json } => {
            let config = slotline_config::load(cli.config.as_deref())?;
            list_features_cmd(&config, json)
        }
        Commands::Serve => {
            let config = slotline_config::load(cli.config.as_deref())?;
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let mut registry = CapabilityRegistry::new();
    for integration in builtin_integrations(&config) {
        registry.add(integration);
    }

    let mut catalog = Catalog::new();
    registry.register_all(&mut catalog);

    let failed = registry.failed();
    for outcome in &failed {
        warn!(
            feature = %outcome.feature.name,
            error = outcome.error.as_deref().unwrap_or(""),
            "integration unavailable"
        );
    }
    if catalog.is_empty() {
        warn!("no integration registered any capability; serving an empty catalog");
    }
    info!(
        registered = registry.successful().len(),
        skipped = registry.skipped().len(),
        failed = failed.len(),
        tools = catalog.tool_names().len(),
        "serving MCP on stdio"
    );

    let instructions = config
        .server
        .instructions
        .clone()
        .or_else(|| (!catalog.is_empty()).then(|| DEFAULT_INSTRUCTIONS.to_string()));
    let server = SlotlineMcpServer::new(Arc::new(catalog))
        .with_name(config.server.name.clone())
        .with_instructions(instructions);

    let result = slotline_mcp::serve_stdio(server).await;
    registry.cleanup_all();
    result
}

fn list_features_cmd(config: &Config, as_json: bool) -> anyhow::Result<()> {
    let integrations: Vec<Integration> = builtin_integrations(config);

    if as_json {
        #[derive(serde::Serialize)]
        struct FeatureJson {
            name: String,
            description: String,
            version: String,
            enabled: bool,
            can_load: bool,
        }
        let rows: Vec<FeatureJson> = integrations
            .iter()
            .map(|i| {
                let d = i.info();
                FeatureJson {
                    name: d.name,
                    description: d.description,
                    version: d.version,
                    enabled: d.enabled,
                    can_load: i.can_load(),
                }
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Built-in integrations ({} total)\n", integrations.len());
    for i in &integrations {
        let d = i.info();
        let status = match (d.enabled, i.can_load()) {
            (false, _) => "disabled",
            (true, true) => "ready",
            (true, false) => "missing configuration",
        };
        println!("  {} {} — {}", d.name, d.version, d.description);
        println!("    status : {status}");
    }
    Ok(())
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries MCP traffic; logs must stay on stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
