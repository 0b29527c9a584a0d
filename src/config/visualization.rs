// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server configuration
//!
//! This module defines the structure for configuring the web server exposing
//! relay control and readings.

use serde::{Deserialize, Serialize};

/// Configuration for the HTTP server component.
///
/// # Fields
///
/// * `enabled` - Start the HTTP server
/// * `port` - TCP port (default: 8080)
/// * `address` - Bind address (default: 127.0.0.1)
/// * `name` - Server identification sent in the `Server` header
/// * `cert` / `key` - Optional base64-encoded PEM certificate and key enabling TLS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// The TCP port the server will listen on.
    ///
    /// Valid range is 1-65534.
    #[serde(default = "default_port")]
    pub port: u16,

    /// The network address the server will bind to.
    ///
    /// Use "0.0.0.0" to bind to all IPv4 interfaces.
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_name")]
    pub name: String,

    /// Base64-encoded PEM certificate. Must be set together with `key`.
    #[serde(default)]
    pub cert: Option<String>,

    /// Base64-encoded PEM private key. Must be set together with `cert`.
    #[serde(default)]
    pub key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_port() -> u16 {
    8080
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_name() -> String {
    format!("WaterQualityBridge/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            port: default_port(),
            address: default_address(),
            name: default_name(),
            cert: None,
            key: None,
        }
    }
}
