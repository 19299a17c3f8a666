use std::process::ExitCode;

use anyhow::{Context, Error};
use clap::Parser;
use log::{error, info, LevelFilter};

use vnx_discovery::{cli::Cli, discovery, error::DiscoveryError, DiscoveryConfig};

fn setup_logging(verbosity: LevelFilter) -> Result<(), Error> {
    env_logger::builder()
        .format_timestamp(None)
        .filter_level(verbosity)
        .try_init()
        .context("Logger already registered")
}

fn run(args: &Cli) -> Result<(), DiscoveryError> {
    let config = DiscoveryConfig::from_cli(args)?;
    let facts = discovery::discover(&config)?;
    info!("Collected {} facts", facts.len());
    Ok(())
}

fn main() -> ExitCode {
    // Parse args
    let args = Cli::parse();

    if let Err(e) = setup_logging(args.verbosity) {
        eprintln!("Failed to initialize logging: {e:?}");
        return ExitCode::from(1);
    }

    // Log version ASAP
    info!("vnx-discovery version: {}", vnx_discovery::VNX_DISCOVERY_VERSION);

    if let Err(e) = run(&args) {
        error!("Discovery failed: {e:?}");

        // Return error if requested
        if let Some(error_path) = args.error.as_ref() {
            if let Err(e2) =
                std::fs::write(error_path, serde_yaml::to_string(&e).unwrap_or_default())
            {
                error!("Failed to write error to file: {e2}");
            }
        }

        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}
