//! SVCMAP CLI - Reconcile a service registry against a desired-state file
//!
//! Each command takes a JSON file of flat attributes and converges the
//! registry toward it:
//! - Register, update and deregister service instances
//! - Delete services
//! - List the instances of a service

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use svcmap_reconcile::Reconciler;
use svcmap_types::Intent;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod commands;
mod config;
mod error;
mod output;

use commands::reconcile::{self, IntentArgs};
use config::CliConfig;
use error::CliResult;

/// SVCMAP CLI application
#[derive(Parser)]
#[command(name = "svcmap")]
#[command(about = "SVCMAP - Service registry reconciliation CLI", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SVCMAP_CONFIG")]
    config: Option<String>,

    /// Registry endpoint (overrides the configured one)
    #[arg(short, long, env = "SVCMAP_ENDPOINT")]
    endpoint: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Register an instance, creating its service when missing
    #[command(name = "register_instance", alias = "register-instance")]
    RegisterInstance(IntentArgs),

    /// Overwrite the attributes of an existing instance
    #[command(name = "update_instance", alias = "update-instance")]
    UpdateInstance(IntentArgs),

    /// Remove an instance from its service
    #[command(name = "deregister_instance", alias = "deregister-instance")]
    DeregisterInstance(IntentArgs),

    /// Delete a service
    #[command(name = "delete_service", alias = "delete-service")]
    DeleteService(IntentArgs),

    /// List the instances of a service
    #[command(name = "get_instances", alias = "get-instances")]
    GetInstances(IntentArgs),

    /// Show configuration
    Config,
}

impl Commands {
    fn into_intent(self) -> Option<(Intent, IntentArgs)> {
        match self {
            Commands::RegisterInstance(args) => Some((Intent::RegisterInstance, args)),
            Commands::UpdateInstance(args) => Some((Intent::UpdateInstance, args)),
            Commands::DeregisterInstance(args) => Some((Intent::DeregisterInstance, args)),
            Commands::DeleteService(args) => Some((Intent::DeleteService, args)),
            Commands::GetInstances(args) => Some((Intent::GetInstances, args)),
            Commands::Config => None,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Load config
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(endpoint) = cli.endpoint {
        config.registry.endpoint = endpoint;
    }

    init_tracing(&config, cli.verbose, cli.log_json);

    let Some((intent, args)) = cli.command.into_intent() else {
        println!("Endpoint: {}", config.registry.endpoint);
        println!(
            "Config file: {}",
            cli.config
                .or_else(|| CliConfig::default_path().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "-".to_string())
        );
        println!("Config: {:#?}", config);
        return Ok(());
    };

    let client = client::HttpRegistryClient::new(
        &config.registry.endpoint,
        Duration::from_secs(config.registry.request_timeout_secs),
    )?;
    let reconciler = Reconciler::new(Arc::new(client), config.reconciler_config());

    tracing::debug!(%intent, endpoint = %config.registry.endpoint, "Dispatching intent");
    reconcile::execute(intent, args, &reconciler, cli.output).await
}

fn init_tracing(config: &CliConfig, verbose: bool, json: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| level.into());

    if json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .without_time()
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_kebab_case_alias_parses() {
        let cli = Cli::try_parse_from(["svcmap", "register-instance", "desired.json", "--set", "port=80"])
            .unwrap();
        let (intent, args) = cli.command.into_intent().unwrap();
        assert_eq!(intent, Intent::RegisterInstance);
        assert_eq!(args.overrides, vec![("port".to_string(), "80".to_string())]);
    }

    #[test]
    fn test_bad_override_is_rejected_at_parse_time() {
        assert!(Cli::try_parse_from(["svcmap", "update_instance", "desired.json", "-s", "port"]).is_err());
    }
}
