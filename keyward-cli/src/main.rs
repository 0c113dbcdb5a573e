//! keyward administrative command line.
//!
//! Runs one licensing operation against the configured database and prints
//! the result as JSON on stdout. Licensing errors are printed as
//! `{"error": {"kind": ..., "message": ...}}` with exit status 2.
//!
//! Usage:
//!   keyward init-config > keyward.toml
//!   keyward --config keyward.toml issue KEY-123 --max 3
//!   keyward activate KEY-123 host-a

use anyhow::{Context, Result};
use clap::Parser;
use keyward_cli::{Cli, Command, ErrorResponse, execute, init_config};
use keyward_license::{Licensing, LicensingConfig};
use serde_json::json;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if cli.command == Command::InitConfig {
        print!("{}", init_config().context("rendering configuration")?);
        return Ok(());
    }

    let config = LicensingConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?
        .apply_env_overrides();
    info!(database = %config.database_path, "opening license database");
    let licensing = Licensing::from_config(&config).context("initialising licensing")?;

    match execute(&licensing, cli.command) {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(err) => {
            let body = json!({ "error": ErrorResponse::from(&err) });
            println!("{}", serde_json::to_string_pretty(&body)?);
            std::process::exit(2);
        }
    }
}
