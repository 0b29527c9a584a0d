// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial link configuration
//!
//! This module defines how the bridge reaches the sensor/relay board.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration of the serial link to the board.
///
/// # Example
///
/// ```
/// use water_quality_bridge::config::SerialConfig;
///
/// let serial = SerialConfig {
///     port: "/dev/ttyACM0".to_string(),
///     baud_rate: 115200,
///     ..Default::default()
/// };
/// assert_eq!(serial.read_timeout_ms, 500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device path or name of the serial port (`/dev/ttyUSB0`, `COM3`, ...).
    #[serde(default = "default_port")]
    pub port: String,

    /// Line speed in baud. The board firmware talks at 9600 by default.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Upper bound of a single blocking read, in milliseconds.
    ///
    /// This is also the longest a shutdown request waits on a silent link.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Replace the serial port with a simulated board.
    #[serde(default)]
    pub simulate: bool,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    500
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            simulate: false,
        }
    }
}
