//! Doctor command - diagnose the chain configuration a deployment would use
//!
//! Usage:
//! ```bash
//! cachet doctor
//! BLOCKCHAIN_CHAIN_NAME=base BLOCKCHAIN_NETWORK=mainnet cachet doctor
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use std::time::Instant;

use cachet_chain::{rpc_env_key, ChainClient, ChainSettings, EvmRegistry, RegistryBackend};

/// Arguments for the doctor command
#[derive(Args)]
pub struct DoctorArgs {
    /// Per-endpoint probe timeout in seconds
    #[arg(long, default_value = "8")]
    timeout: u64,
}

/// Run the doctor command
pub async fn run(args: DoctorArgs) -> Result<()> {
    let settings = ChainSettings::from_env()
        .with_probe_timeout(std::time::Duration::from_secs(args.timeout));

    println!("{}", "Cachet Chain Diagnostics".bold().cyan());
    println!("{}", "═".repeat(50).cyan());
    println!();

    print_configuration(&settings);

    let reachable = probe_endpoints(&settings).await;

    if let Some(registry) = settings.registry_address.clone() {
        if reachable > 0 {
            query_registry(&settings, &registry).await;
        }
    }

    println!();
    if reachable == 0 {
        crate::print_error("no RPC endpoint is reachable");
        std::process::exit(1);
    }
    crate::print_success(&format!(
        "{reachable} of {} endpoint(s) reachable",
        settings.endpoints.len()
    ));

    Ok(())
}

fn print_configuration(settings: &ChainSettings) {
    let env_key = rpc_env_key(settings.chain, settings.network);
    let primary = std::env::var(&env_key).ok().filter(|v| !v.is_empty());

    println!("{}", "Configuration:".bold());
    println!("  {} {}", "Chain:".dimmed(), settings.chain);
    println!("  {} {}", "Network:".dimmed(), settings.network);
    println!(
        "  {} {}",
        format!("{env_key}:").dimmed(),
        primary.as_deref().unwrap_or("(unset, curated fallbacks only)")
    );
    println!(
        "  {} {}",
        "Signer:".dimmed(),
        presence(settings.signer_address.as_deref())
    );
    println!(
        "  {} {}",
        "Registry:".dimmed(),
        presence(settings.registry_address.as_deref())
    );
    println!(
        "  {} {}",
        "Writes:".dimmed(),
        if settings.writes_enabled() {
            "enabled".green().to_string()
        } else {
            "disabled".yellow().to_string()
        }
    );
    println!();
}

fn presence(value: Option<&str>) -> String {
    match value {
        Some(v) => v.green().to_string(),
        None => "(not configured)".yellow().to_string(),
    }
}

/// Probe every candidate individually and return how many answered
async fn probe_endpoints(settings: &ChainSettings) -> usize {
    let mut table = Table::new();
    table.set_header(vec!["Endpoint", "Status", "Block", "Latency"]);

    let mut reachable = 0;

    for endpoint in &settings.endpoints {
        let single = settings.clone().with_endpoints(vec![endpoint.clone()]);
        let started = Instant::now();

        let row = match ChainClient::new(single) {
            Ok(client) => match client.connect().await {
                Ok(conn) => {
                    reachable += 1;
                    let latency = started.elapsed();
                    let block = conn.block_number().await.map_or_else(
                        |_| "?".to_string(),
                        |b| b.to_string(),
                    );
                    vec![
                        Cell::new(endpoint),
                        Cell::new("up").fg(Color::Green),
                        Cell::new(block),
                        Cell::new(format!("{}ms", latency.as_millis())),
                    ]
                }
                Err(e) => vec![
                    Cell::new(endpoint),
                    Cell::new("down").fg(Color::Red),
                    Cell::new("-"),
                    Cell::new(truncate(&e.to_string(), 40)),
                ],
            },
            Err(e) => vec![
                Cell::new(endpoint),
                Cell::new("error").fg(Color::Red),
                Cell::new("-"),
                Cell::new(truncate(&e.to_string(), 40)),
            ],
        };

        table.add_row(row);
    }

    println!("{table}");
    reachable
}

async fn query_registry(settings: &ChainSettings, registry_address: &str) {
    println!();
    println!("{}", "Registry:".bold());

    match EvmRegistry::new(settings.clone()) {
        Ok(registry) => match registry.total(registry_address).await {
            Ok(total) => {
                println!(
                    "  {} {}",
                    "Credentials recorded:".dimmed(),
                    total.to_string().green()
                );
            }
            Err(e) => {
                println!("  {} {}", "Query failed:".dimmed(), e.to_string().red());
            }
        },
        Err(e) => {
            println!("  {} {}", "Client error:".dimmed(), e.to_string().red());
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{head}...")
    }
}
