// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the water quality bridge
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! - `serial`: Serial link to the sensor/relay board
//! - `persistence`: Storage of sensor readings
//! - `visualization`: HTTP server for relay control and readings
//! - `daemon`: Background task supervision
//!
//! ## Usage
//!
//! ```no_run
//! use water_quality_bridge::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some("/dev/ttyACM0".to_string()), // Serial port
//!     Some(115200),                     // Baud rate
//!     false,                            // Simulate the board
//!     Some(8081),                       // Web port
//!     Some("0.0.0.0".to_string()),      // Web address
//!     None,                             // Database path
//! );
//!
//! println!("Serial port: {}", config.serial.port);
//! ```

pub mod daemon;
pub mod persistence;
pub mod serial;
pub mod utils;
pub mod visualization;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use daemon::DaemonConfig;
pub use persistence::{PersistenceBackend, PersistenceConfig};
pub use serial::SerialConfig;
pub use utils::{is_valid_ip_address, output_config_schema, validate_specific_rules};
pub use visualization::VisualizationConfig;

/// Embedded JSON schema every configuration file is checked against.
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its defaults when absent, so an empty file is
/// a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Serial link to the board.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Storage of sensor readings.
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Settings for the HTTP server component.
    #[serde(default)]
    pub visualization: VisualizationConfig,

    /// Background task supervision.
    #[serde(default)]
    pub daemon: DaemonConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// A missing file is created with default values. A file failing schema
    /// validation, deserialization or the specific rules of
    /// [`validate_specific_rules`] is rejected, and a `.sample.yaml` file with
    /// default values is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config = match Self::from_yaml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                if let Err(sample_err) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {:#}", sample_err);
                }
                return Err(err.context(format!(
                    "Invalid configuration file {}",
                    path.display()
                )));
            }
        };

        Ok(config)
    }

    /// Parse and validate a configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config =
            serde_yml::from_str(contents).context("Failed to deserialize configuration")?;

        validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only values explicitly provided override the existing configuration.
    ///
    /// # Parameters
    ///
    /// * `serial_port` - Serial device of the board
    /// * `baud_rate` - Serial line speed
    /// * `simulate` - If true, forces the simulated board
    /// * `web_port` - TCP port for the HTTP server
    /// * `web_address` - Network address for the HTTP server to bind to
    /// * `database_path` - SQLite database file for readings
    pub fn apply_args(
        &mut self,
        serial_port: Option<String>,
        baud_rate: Option<u32>,
        simulate: bool,
        web_port: Option<u16>,
        web_address: Option<String>,
        database_path: Option<String>,
    ) {
        if let Some(port) = serial_port {
            debug!("Overriding serial port from command line: {}", port);
            self.serial.port = port;
        }
        if let Some(baud) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud);
            self.serial.baud_rate = baud;
        }
        if simulate {
            debug!("Simulated board requested from command line");
            self.serial.simulate = true;
        }

        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.visualization.port = web_port;
        }
        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.visualization.address = web_address;
        }

        if let Some(path) = database_path {
            debug!("Overriding database path from command line: {}", path);
            self.persistence.database_path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.visualization.port, 8080);
        assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = Config::from_yaml_str(
            "serial:\n  port: COM3\npersistence:\n  backend: memory\n",
        )
        .unwrap();
        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.serial.read_timeout_ms, 500);
        assert_eq!(config.persistence.backend, PersistenceBackend::Memory);
        assert!(config.visualization.enabled);
    }

    #[test]
    fn test_schema_rejects_unknown_and_out_of_range_values() {
        assert!(Config::from_yaml_str("serial:\n  baud: 9600\n").is_err());
        assert!(Config::from_yaml_str("visualization:\n  port: 70000\n").is_err());
        assert!(Config::from_yaml_str("serial:\n  read_timeout_ms: 0\n").is_err());
        assert!(Config::from_yaml_str("persistence:\n  backend: mysql\n").is_err());
    }

    #[test]
    fn test_empty_port_only_allowed_when_simulated() {
        let config = Config::from_yaml_str("serial:\n  port: \"\"\n  simulate: true\n").unwrap();
        assert!(config.serial.port.is_empty());
        assert!(Config::from_yaml_str("serial:\n  port: \"\"\n").is_err());
    }

    #[test]
    fn test_default_config_round_trips_through_schema() {
        let yaml = serde_yml::to_string(&Config::default()).unwrap();
        assert!(Config::from_yaml_str(&yaml).is_ok());
    }

    #[test]
    fn test_apply_args_only_overrides_given_values() {
        let mut config = Config::default();
        config.apply_args(None, Some(115200), true, None, Some("0.0.0.0".to_string()), None);
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert!(config.serial.simulate);
        assert_eq!(config.visualization.port, 8080);
        assert_eq!(config.visualization.address, "0.0.0.0");
        assert_eq!(config.persistence.database_path, "water_quality.db");
    }
}
