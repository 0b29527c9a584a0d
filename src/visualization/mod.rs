// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).
//!
//! Visualization module
//!
//! This module exposes the bridge over HTTP: relay control, relay states and
//! sensor readings.

pub mod api;
pub mod server;

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;

use crate::config::VisualizationConfig;

/// Rocket configuration for the given server settings.
///
/// Rocket's own Ctrl-C handling is disabled: the daemon decides when the
/// server stops.
pub fn build_figment(config: &VisualizationConfig) -> Result<Figment> {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.name.clone()))
        .merge(("limits", Limits::new().limit("form", 16.kibibytes())))
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("log_level", LogLevel::Normal))
        .merge(("shutdown.ctrlc", false));

    if let (Some(cert), Some(key)) = (&config.cert, &config.key) {
        debug!("SSL certificates found in configuration, enabling TLS");

        let cert_data = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
        let key_data = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;

        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));

        info!("TLS enabled for web server");
    }

    Ok(figment)
}
