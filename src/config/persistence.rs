// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reading persistence configuration

use serde::{Deserialize, Serialize};

/// Storage technology used for readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceBackend {
    /// SQLite database file at `database_path`
    #[default]
    Sqlite,
    /// Bounded in-memory buffer, lost on exit
    Memory,
}

/// Configuration of the reading store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// When disabled, readings are parsed and exposed as latest value only.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: PersistenceBackend,

    /// Path of the SQLite database, used by the `sqlite` backend.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Default number of readings returned by `GET /readings`.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_database_path() -> String {
    "water_quality.db".to_string()
}

fn default_history_limit() -> usize {
    10
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: PersistenceBackend::default(),
            database_path: default_database_path(),
            history_limit: default_history_limit(),
        }
    }
}
