// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Water quality bridge library
//!
//! Bridges a microcontroller board carrying turbidity/TDS sensors and four
//! relays, reached over a serial line, with a reading store and an HTTP relay
//! control surface.
//!
//! - [`protocol`]: line frames exchanged with the board
//! - [`relay`]: relay vocabulary and the shared relay state cache
//! - [`transport`]: serial and in-memory links
//! - [`persistence`]: reading stores
//! - [`bridge`]: reader loop and relay controller
//! - [`visualization`]: HTTP server
//! - [`daemon`]: task supervision
//! - [`config`]: YAML configuration

pub mod bridge;
pub mod config;
pub mod daemon;
pub mod persistence;
pub mod protocol;
pub mod relay;
pub mod transport;
pub mod visualization;

pub use config::Config;
pub use daemon::Daemon;
