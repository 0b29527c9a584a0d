// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::fs;
use std::path::Path;
use std::sync::Once;

use anyhow::Result;
use tempfile::tempdir;
use water_quality_bridge::config::{Config, PersistenceBackend, SerialConfig, VisualizationConfig};

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

#[test]
fn test_config_load_and_save() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let config = Config {
        serial: SerialConfig {
            port: "/dev/ttyACM0".to_string(),
            baud_rate: 115200,
            ..Default::default()
        },
        visualization: VisualizationConfig {
            port: 8081,
            address: "192.168.1.1".to_string(),
            name: "TestServer".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    config.save_to_file(&config_path)?;

    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config.serial.port, "/dev/ttyACM0");
    assert_eq!(loaded_config.serial.baud_rate, 115200);
    assert_eq!(loaded_config.visualization.port, 8081);
    assert_eq!(loaded_config.visualization.address, "192.168.1.1");
    assert_eq!(loaded_config.visualization.name, "TestServer");

    Ok(())
}

#[test]
fn test_missing_file_is_created_with_defaults() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("non_existent.yaml");

    let config = Config::from_file(&path)?;

    assert!(path.exists());
    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.persistence.backend, PersistenceBackend::Sqlite);
    assert_eq!(config.persistence.history_limit, 10);
    assert_eq!(config.visualization.port, 8080);

    // The written file loads back
    let reloaded = Config::from_file(&path)?;
    assert_eq!(reloaded.persistence.database_path, "water_quality.db");
    Ok(())
}

#[test]
fn test_invalid_file_creates_sample() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    let invalid_yaml = r#"
serial:
  port: 12
  baud_rate: "fast"
visualization:
  port: "not-an-integer"
"#;
    fs::write(&config_path, invalid_yaml)?;

    assert!(Config::from_file(&config_path).is_err());

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(Path::new(&sample_path).exists(), "Sample config file was not created");

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config.visualization.port, 8080);
    Ok(())
}

#[test]
fn test_specific_rules_are_applied_on_load() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Schema-valid, but a certificate without its key
    fs::write(&config_path, "visualization:\n  cert: Y2VydA==\n")?;
    let err = Config::from_file(&config_path).unwrap_err();
    assert!(format!("{:#}", err).contains("without a key"));
    Ok(())
}

#[test]
fn test_unparsable_yaml_is_rejected() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "serial: [unclosed\n")?;

    assert!(Config::from_file(&config_path).is_err());
    Ok(())
}
