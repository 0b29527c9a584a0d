// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the water-quality-bridge project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Reading persistence
//!
//! The reader loop only relies on [`ReadingSink::insert`]: one call per parsed
//! `DATA:` frame, at-most-once, without retry or buffering. The HTTP surface
//! additionally reads back recent rows through [`ReadingHistory`].
//!
//! Sinks accept any finite value; range validation is out of scope here.
//!
//! Backends:
//!
//! * [`sqlite::SqliteStore`] - a `water_readings` table in a SQLite file
//! * [`memory::MemoryStore`] - a bounded in-memory buffer

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by a persistence backend.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("Stored value is corrupt: {0}")]
    Corrupt(String),
}

/// A reading as stored, with the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    pub turbidity: f64,
    pub tds: f64,
    pub reading_time: DateTime<Utc>,
}

/// Destination of sensor readings.
pub trait ReadingSink: Send + Sync {
    /// Store one reading. May block.
    fn insert(&self, turbidity: f64, tds: f64) -> Result<(), SinkError>;
}

/// Read access to stored readings.
pub trait ReadingHistory: Send + Sync {
    /// Up to `limit` readings, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<StoredReading>, SinkError>;
}
