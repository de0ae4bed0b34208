// SPDX-FileCopyrightText: 2026 PropCare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PropCare - maintenance triage for rental properties.
//!
//! Binary entry point: the chat API server, the notification delivery
//! worker, and operator commands for the outbox.

mod outbox;
mod serve;
mod shutdown;
mod worker;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use propcare_config::model::PropcareConfig;

/// PropCare - maintenance triage for rental properties.
#[derive(Parser, Debug)]
#[command(name = "propcare", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the chat API server.
    Serve {
        /// Also run a delivery worker in this process.
        #[arg(long)]
        with_worker: bool,
    },
    /// Run the notification delivery worker.
    Worker {
        /// Run a single polling pass and exit.
        #[arg(long)]
        once: bool,
    },
    /// Inspect and repair the notification outbox.
    Outbox {
        #[command(subcommand)]
        action: OutboxCommands,
    },
    /// Manage PropCare configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum OutboxCommands {
    /// Show row counts per status.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Move a dead-lettered notification back to pending.
    Requeue { id: i64 },
    /// Show one notification.
    Show { id: i64 },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Load and validate configuration, then report what is missing.
    Check,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => propcare_config::load_and_validate_path(path),
        None => propcare_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            propcare_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { with_worker } => serve::run_serve(config, with_worker).await,
        Commands::Worker { once } => worker::run_worker(config, once).await,
        Commands::Outbox { action } => match action {
            OutboxCommands::Status { json } => outbox::run_status(&config, json).await,
            OutboxCommands::Requeue { id } => outbox::run_requeue(&config, id).await,
            OutboxCommands::Show { id } => outbox::run_show(&config, id).await,
        },
        Commands::Config {
            action: ConfigCommands::Check,
        } => {
            run_config_check(&config);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_config_check(config: &PropcareConfig) {
    println!("configuration OK");
    println!("  database: {}", config.storage.database_path);
    println!("  server:   {}:{}", config.server.host, config.server.port);
    println!("  model:    {}", config.openai.model);
    for warning in config_warnings(config) {
        println!("warning: {warning}");
    }
}

/// Settings that pass validation but leave part of the system inert.
fn config_warnings(config: &PropcareConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    if config.openai.resolved_api_key().is_none() {
        warnings.push("no OpenAI API key (set openai.api_key or OPENAI_API_KEY)".to_string());
    }
    if config.notify.to_email.is_none() {
        warnings.push("notify.to_email is not set; manager notifications are skipped".to_string());
    }
    if config.email.transport == propcare_config::model::EmailTransportKind::Resend
        && config.email.resolved_resend_api_key().is_none()
    {
        warnings.push("no Resend API key (set email.resend_api_key or RESEND_API_KEY)".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_outbox_requeue() {
        let cli = Cli::try_parse_from(["propcare", "outbox", "requeue", "42"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Outbox {
                action: OutboxCommands::Requeue { id: 42 }
            }
        ));
    }

    #[test]
    fn parses_global_config_flag() {
        let cli =
            Cli::try_parse_from(["propcare", "worker", "--once", "--config", "/tmp/p.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.toml")));
        assert!(matches!(cli.command, Commands::Worker { once: true }));
    }

    #[test]
    fn warnings_flag_missing_recipient() {
        let mut config = PropcareConfig::default();
        config.openai.api_key = Some("sk-test".into());
        config.email.resend_api_key = Some("re-test".into());
        let warnings = config_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("notify.to_email"));

        config.notify.to_email = Some("ops@example.com".into());
        assert!(config_warnings(&config).is_empty());
    }
}
