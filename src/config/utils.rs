// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, warn};

use super::{Config, PersistenceBackend, CONFIG_SCHEMA};

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./water_quality_bridge --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    println!("{}", formatted_config_schema()?);
    Ok(())
}

/// The embedded JSON schema, pretty-printed
pub fn formatted_config_schema() -> Result<String> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
    serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against rules the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **TLS**: certificate and key are set together and are valid base64
/// - **Port Range**: the HTTP port is within 1-65534
/// - **Address**: a malformed bind address only logs a warning
/// - **Serial**: a non-empty port name (unless simulated), a non-zero baud rate
///   and a read timeout within 10-5000 ms
/// - **Persistence**: the SQLite backend needs a database path
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let visualization = &config.visualization;
    match (&visualization.cert, &visualization.key) {
        (Some(cert), Some(key)) => {
            base64::engine::general_purpose::STANDARD
                .decode(cert)
                .context("SSL certificate is not valid base64")?;
            base64::engine::general_purpose::STANDARD
                .decode(key)
                .context("SSL key is not valid base64")?;
        }
        (Some(_), None) => anyhow::bail!("SSL certificate provided without a key"),
        (None, Some(_)) => anyhow::bail!("SSL key provided without a certificate"),
        (None, None) => {}
    }

    if visualization.port < 1 || visualization.port > 65534 {
        anyhow::bail!("Invalid port number: {}", visualization.port);
    }

    if !is_valid_ip_address(&visualization.address) {
        warn!(
            "Potentially invalid address format: {}",
            visualization.address
        );
    }

    let serial = &config.serial;
    if !serial.simulate && serial.port.trim().is_empty() {
        anyhow::bail!("Serial port name must not be empty");
    }
    if serial.baud_rate == 0 {
        anyhow::bail!("Baud rate must be greater than zero");
    }
    if !(10..=5000).contains(&serial.read_timeout_ms) {
        anyhow::bail!(
            "Serial read timeout must be between 10 and 5000 ms, got {}",
            serial.read_timeout_ms
        );
    }

    let persistence = &config.persistence;
    if persistence.enabled
        && persistence.backend == PersistenceBackend::Sqlite
        && persistence.database_path.trim().is_empty()
    {
        anyhow::bail!("The sqlite backend requires a database_path");
    }
    if !(1..=100).contains(&persistence.history_limit) {
        anyhow::bail!(
            "history_limit must be between 1 and 100, got {}",
            persistence.history_limit
        );
    }

    Ok(())
}
