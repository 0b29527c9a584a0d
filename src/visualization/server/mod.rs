// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Web server for relay control and readings
//!
//! ## Architecture
//!
//! - **API Endpoints**: relay commands, relay states and sensor readings
//! - **OpenAPI**: generated document and RapiDoc viewer
//! - **CORS Support**: enables requests from a dashboard on another origin
//! - **Catchers**: every error is answered as `{ "error": ... }`
//!
//! The server address, port and TLS settings come from the `figment` built by
//! the daemon.

pub mod builder;
pub mod cors;
pub mod handlers;

pub use builder::build_rocket;
