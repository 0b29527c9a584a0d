// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Daemon supervision settings

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between two heartbeat log lines.
    #[serde(default = "default_heartbeat_interval_s")]
    pub heartbeat_interval_s: u64,

    /// Seconds to wait for each task when shutting down.
    #[serde(default = "default_join_timeout_s")]
    pub join_timeout_s: u64,
}

fn default_heartbeat_interval_s() -> u64 {
    60
}

fn default_join_timeout_s() -> u64 {
    5
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval_s: default_heartbeat_interval_s(),
            join_timeout_s: default_join_timeout_s(),
        }
    }
}
