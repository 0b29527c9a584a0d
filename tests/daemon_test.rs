// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::time::Duration;

use anyhow::Result;
use tokio::time::{sleep, timeout, Instant};

use water_quality_bridge::bridge::ReaderState;
use water_quality_bridge::config::{Config, PersistenceBackend};
use water_quality_bridge::daemon::Daemon;
use water_quality_bridge::relay::{RelayState, RelayStateCache};
use water_quality_bridge::transport::MockBoard;

fn test_config() -> Config {
    let mut config = Config::default();
    config.visualization.enabled = false;
    config.persistence.backend = PersistenceBackend::Memory;
    config.daemon.join_timeout_s = 2;
    config
}

/// Poll until the cache holds `expected` or a second has passed
async fn wait_for_states(cache: &RelayStateCache, expected: [RelayState; 4]) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if cache.get().states() == expected {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_frames_reach_the_cache_and_commands_reach_the_board() -> Result<()> {
    let (reader, writer, board) = MockBoard::link(Duration::from_millis(10));
    let mut daemon = Daemon::new();
    daemon
        .launch_with_link(&test_config(), Box::new(reader), Box::new(writer))
        .await?;

    assert!(daemon.reader_state().is_some());
    board.send_line("INIT:0,1,0,1");
    use RelayState::{Off, On};
    assert!(wait_for_states(daemon.cache(), [Off, On, Off, On]).await);

    board.send_line("DATA:3.25,410.5");
    let deadline = Instant::now() + Duration::from_secs(1);
    while daemon.latest().get().is_none() && Instant::now() < deadline {
        sleep(Duration::from_millis(10)).await;
    }
    let reading = daemon.latest().get().expect("reading parsed");
    assert_eq!(reading.turbidity, 3.25);
    assert_eq!(reading.tds, 410.5);

    let controller = daemon.controller().expect("controller").clone();
    let snapshot = tokio::task::spawn_blocking(move || controller.handle("1", "1")).await??;
    assert_eq!(snapshot.states(), [On, On, Off, On]);
    assert_eq!(board.take_written(), vec!["RELAY:1,1\n".to_string()]);

    daemon.shutdown();
    timeout(Duration::from_secs(5), daemon.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_closed_link_raises_fatal_signal() -> Result<()> {
    let (reader, writer, board) = MockBoard::link(Duration::from_millis(10));
    let mut daemon = Daemon::new();
    daemon
        .launch_with_link(&test_config(), Box::new(reader), Box::new(writer))
        .await?;
    assert!(daemon.is_running());

    board.close();
    timeout(Duration::from_secs(2), daemon.wait_fatal()).await?;
    assert!(!daemon.is_running());
    assert_eq!(daemon.reader_state(), Some(ReaderState::ShuttingDown));

    daemon.shutdown();
    timeout(Duration::from_secs(5), daemon.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_a_silent_link() -> Result<()> {
    let (reader, writer, _board) = MockBoard::link(Duration::from_millis(10));
    let mut daemon = Daemon::new();
    daemon
        .launch_with_link(&test_config(), Box::new(reader), Box::new(writer))
        .await?;

    daemon.shutdown();
    let started = Instant::now();
    timeout(Duration::from_secs(5), daemon.join()).await??;
    assert!(started.elapsed() < Duration::from_secs(2));
    Ok(())
}

#[tokio::test]
async fn test_simulated_board_produces_readings() -> Result<()> {
    let mut config = test_config();
    config.serial.simulate = true;
    config.serial.read_timeout_ms = 50;

    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    let deadline = Instant::now() + Duration::from_secs(3);
    while daemon.latest().get().is_none() && Instant::now() < deadline {
        sleep(Duration::from_millis(20)).await;
    }
    assert!(daemon.latest().get().is_some());

    daemon.shutdown();
    timeout(Duration::from_secs(10), daemon.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_failed_storage_stops_the_simulated_board() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut config = test_config();
    config.serial.simulate = true;
    config.serial.read_timeout_ms = 50;
    config.persistence.backend = PersistenceBackend::Sqlite;
    config.persistence.database_path = dir
        .path()
        .join("missing")
        .join("readings.db")
        .to_string_lossy()
        .into_owned();

    let mut daemon = Daemon::new();
    let err = daemon.launch(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("readings.db"));
    assert!(!daemon.is_running());

    // The simulator thread must have been released
    timeout(Duration::from_secs(5), daemon.join()).await??;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_right_after_launch_is_prompt() -> Result<()> {
    let mut config = test_config();
    config.daemon.heartbeat_interval_s = 3600;
    config.daemon.join_timeout_s = 30;

    for _ in 0..20 {
        let (reader, writer, _board) = MockBoard::link(Duration::from_millis(10));
        let mut daemon = Daemon::new();
        daemon
            .launch_with_link(&config, Box::new(reader), Box::new(writer))
            .await?;
        daemon.shutdown();
        timeout(Duration::from_secs(2), daemon.join()).await??;
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_serial_port_fails_launch() {
    let mut config = test_config();
    config.serial.port = "/dev/does-not-exist-water-bridge".to_string();

    let mut daemon = Daemon::new();
    let err = daemon.launch(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("/dev/does-not-exist-water-bridge"));
}
