// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the water quality serial bridge

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use tokio::signal;

use water_quality_bridge::config::{self, Config};
use water_quality_bridge::daemon::Daemon;

/// Bridge between a water quality sensor/relay board, a reading store and an
/// HTTP relay control surface
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial device of the board (e.g. /dev/ttyUSB0, COM3)
    #[arg(long)]
    serial_port: Option<String>,

    /// Serial line speed in baud
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Use a simulated board instead of the serial port
    #[arg(long)]
    simulate: bool,

    /// Web server port (default: 8080)
    #[arg(short = 'p', long)]
    web_port: Option<u16>,

    /// Web server address (default: 127.0.0.1)
    #[arg(short = 'a', long)]
    web_address: Option<String>,

    /// SQLite database file for readings
    #[arg(long)]
    database: Option<String>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.serial_port,
        args.baud_rate,
        args.simulate,
        args.web_port,
        args.web_address,
        args.database,
    );
    config::validate_specific_rules(&config)?;

    info!("Starting in daemon mode");
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    let mut link_lost = false;
    tokio::select! {
        result = signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Received shutdown signal, terminating daemon"),
                Err(err) => error!("Error waiting for shutdown signal: {}", err),
            }
        }
        _ = daemon.wait_fatal() => {
            error!("Bridge can no longer run, terminating daemon");
            link_lost = true;
        }
    }

    daemon.shutdown();
    daemon.join().await?;

    if link_lost {
        anyhow::bail!("Board link closed");
    }
    Ok(())
}
