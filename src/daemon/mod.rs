// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Module
//!
//! The daemon owns the bridge at run time: it opens the board link and the
//! reading store, then runs the background tasks.
//!
//! ## Tasks
//!
//! * **Reader**: the frame reader loop, on a blocking thread
//! * **Web server**: relay control and readings over HTTP
//! * **Heartbeat**: periodic debug line with the relay states
//! * **Simulator**: the simulated board, when `serial.simulate` is set
//!
//! A closed link stops the reader and raises the signal awaited by
//! [`Daemon::wait_fatal`]; the caller is expected to shut down.
//!
//! ## Usage
//!
//! ```no_run
//! use water_quality_bridge::{config::Config, daemon::Daemon};
//!
//! async fn run() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new();
//!     daemon.launch(&config).await?;
//!
//!     tokio::select! {
//!         _ = tokio::signal::ctrl_c() => {}
//!         _ = daemon.wait_fatal() => {}
//!     }
//!
//!     daemon.shutdown();
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod launch_daemon;

pub use launch_daemon::Daemon;
